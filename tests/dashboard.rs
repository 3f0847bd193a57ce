use listing_lens::data::loader::read_csv;
use listing_lens::engine::aggregate::{category_counts, histogram, pivot_mean};
use listing_lens::engine::{geo, lookup};
use listing_lens::{
    apply, AggregateRequest, AggregateResult, CategoricalAttr, DashboardConfig, DashboardError,
    DashboardState, Dataset, FilterSpec, NumericAttr,
};

const LISTINGS: &str = "\
name,country,property_type,room_type,cancellation_policy,price,number_of_reviews,review_scores_rating,latitude,longitude,availability_30,availability_60,availability_90,availability_365
Ocean Loft,Portugal,Loft,Entire home/apt,strict,150,42,97,38.70,-9.14,5,20,40,120
Alfama Room,Portugal,Apartment,Private room,flexible,60,120,92,38.71,-9.13,0,10,25,300
Belem House,Portugal,House,Entire home/apt,moderate,,3,,38.69,-9.20,30,60,90,365
Gracia Flat,Spain,Apartment,Entire home/apt,strict,110,15,88,41.40,2.16,12,30,45,200
Raval Bunk,Spain,Hostel,Shared room,flexible,25,300,81,41.38,2.17,0,0,5,50
Ipanema Suite,Brazil,Apartment,Private room,moderate,80,n/a,95,-22.98,-43.20,7,14,21,180
";

fn dataset() -> Dataset {
    Dataset::new(read_csv(LISTINGS.as_bytes()).expect("fixture parses"))
}

#[test]
fn test_load_filter_aggregate() {
    let ds = dataset();
    assert_eq!(ds.len(), 6);
    assert_eq!(
        ds.distinct_values(CategoricalAttr::Country),
        vec!["Portugal", "Spain", "Brazil"]
    );
    assert_eq!(ds.numeric_range(NumericAttr::Price).unwrap(), (25.0, 150.0));

    let spec = FilterSpec::new()
        .with_values(CategoricalAttr::Country, ["Portugal", "Spain"])
        .with_range(NumericAttr::Price, 25.0, 110.0);
    let view = apply(&ds, &spec);
    let names: Vec<&str> = view.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Alfama Room", "Gracia Flat", "Raval Bunk"]);

    let rooms = category_counts(&view, CategoricalAttr::RoomType);
    assert_eq!(rooms.get("Private room"), Some(1));
    assert_eq!(rooms.get("Entire home/apt"), Some(1));
    assert_eq!(rooms.total(), 3);

    let pivot = pivot_mean(
        &view,
        CategoricalAttr::PropertyType,
        CategoricalAttr::RoomType,
        NumericAttr::Price,
    );
    assert_eq!(pivot.get("Apartment", "Private room"), Some(60.0));
    assert_eq!(pivot.get("Hostel", "Private room"), None);
}

#[test]
fn test_histogram_total_matches_valid_count() {
    let ds = dataset();
    let view = ds.all();
    for bins in [1, 3, 7, 50] {
        let h = histogram(&view, NumericAttr::Price, bins);
        assert_eq!(h.total(), 5);
        let h = histogram(&view, NumericAttr::NumberOfReviews, bins);
        assert_eq!(h.total(), 5);
    }
}

#[test]
fn test_filter_order_independent() {
    let ds = dataset();
    let x = FilterSpec::new().with_values(CategoricalAttr::RoomType, ["Entire home/apt"]);
    let y = FilterSpec::new().with_range(NumericAttr::NumberOfReviews, 10.0, 100.0);
    assert_eq!(apply(&ds, &x).refine(&y), apply(&ds, &y).refine(&x));
    assert_eq!(apply(&ds, &x).refine(&y), apply(&ds, &x.merge(&y).unwrap()));
}

#[test]
fn test_lookup_and_geo() {
    let ds = dataset();
    let portugal = apply(
        &ds,
        &FilterSpec::new().with_values(CategoricalAttr::Country, ["Portugal"]),
    );
    let loft = lookup::find_by_name(&portugal, "Ocean Loft").unwrap();
    assert_eq!(loft.numeric(NumericAttr::ReviewScoresRating), Some(97.0));
    assert!(matches!(
        lookup::find_by_name(&portugal, "Gracia Flat"),
        Err(DashboardError::NotFound(_))
    ));

    let projection = geo::project(&portugal, &DashboardConfig::default().map).unwrap();
    assert_eq!(projection.points.len(), 3);
    assert!((projection.centroid.latitude - 38.70).abs() < 1e-9);
    assert!((projection.centroid.longitude - (-9.14 - 9.13 - 9.20) / 3.0).abs() < 1e-9);
    // Belem House has no price and gets the minimum radius.
    assert_eq!(projection.points[2].radius, 1.0);
    assert_eq!(projection.points[0].radius, 15.0);
}

#[test]
fn test_state_round_trip_through_json() {
    let mut state = DashboardState::new(dataset(), DashboardConfig::default());
    let filters: FilterSpec = serde_json::from_str(
        r#"{"country": ["Spain"], "number_of_reviews": {"min": 0, "max": 1000}}"#,
    )
    .unwrap();
    state.set_filters(filters);
    assert_eq!(state.view().len(), 2);

    let request: AggregateRequest =
        serde_json::from_str(r#"{"kind": "ranked_category_bar", "attribute": "cancellation_policy"}"#)
            .unwrap();
    match state.aggregate(&request).unwrap() {
        AggregateResult::CategoryCounts(counts) => {
            assert_eq!(counts.get("strict"), Some(1));
            assert_eq!(counts.get("flexible"), Some(1));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let json = serde_json::to_value(state.analysis()).unwrap();
    assert_eq!(json["listing_count"], 2);
    assert_eq!(json["room_types"]["attribute"], "room_type");
}

#[test]
fn test_empty_view_is_safe_everywhere() {
    let mut state = DashboardState::new(dataset(), DashboardConfig::default());
    state.set_filters(FilterSpec::new().with_values(CategoricalAttr::Country, Vec::<String>::new()));
    assert!(state.view().is_empty());

    let page = state.analysis();
    assert_eq!(page.listing_count, 0);
    assert!(page.room_types.is_empty());
    assert!(page.price_heatmap.is_empty());
    assert!(page.review_scores.is_empty());
    assert_eq!(state.map().unwrap_err(), DashboardError::EmptyView);
    assert!(state.exploration(None).detail.is_none());
}
