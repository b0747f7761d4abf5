//! Tests for query bounding boxes and their WMS serialization.

use map_common::bbox::{BboxParseError, BoundingBox, LngLat, LngLatBounds, POINT_QUERY_EPSILON};

fn nl_bounds() -> LngLatBounds {
    LngLatBounds::new(LngLat::new(4.0, 51.0), LngLat::new(6.0, 53.0))
}

// ============================================================================
// Point selection
// ============================================================================

#[test]
fn test_point_box_is_padded_by_epsilon() {
    let bbox = BoundingBox::around_point(LngLat::new(5.0, 52.0));
    assert!((bbox.min_x - (5.0 - POINT_QUERY_EPSILON)).abs() < 1e-12);
    assert!((bbox.max_y - (52.0 + POINT_QUERY_EPSILON)).abs() < 1e-12);
    assert!(bbox.min_x < 5.0 && bbox.max_x > 5.0);
    assert!(bbox.min_y < 52.0 && bbox.max_y > 52.0);
}

#[test]
fn test_point_box_wms_string() {
    let bbox = BoundingBox::around_point(LngLat::new(5.0, 52.0));
    assert_eq!(bbox.to_wms_string(), "4.999,51.999,5.001,52.001");
}

#[test]
fn test_point_box_negative_coordinates() {
    let bbox = BoundingBox::around_point(LngLat::new(-70.0, -33.0));
    assert!(bbox.min_x < -70.0 && bbox.max_x > -70.0);
    assert!(bbox.min_y < -33.0 && bbox.max_y > -33.0);
}

// ============================================================================
// Area selection
// ============================================================================

#[test]
fn test_bounds_box_uses_corners_directly() {
    let bbox = BoundingBox::from_bounds(&nl_bounds());
    assert_eq!(bbox, BoundingBox::new(4.0, 51.0, 6.0, 53.0));
    assert_eq!(bbox.to_wms_string(), "4,51,6,53");
}

#[test]
fn test_bounds_box_keeps_fractional_corners() {
    let bounds = LngLatBounds::new(LngLat::new(4.25, 51.5), LngLat::new(6.125, 53.75));
    assert_eq!(
        BoundingBox::from_bounds(&bounds).to_wms_string(),
        "4.25,51.5,6.125,53.75"
    );
}

// ============================================================================
// Selection precedence
// ============================================================================

#[test]
fn test_query_prefers_point_over_bounds() {
    let bbox = BoundingBox::for_query(Some(LngLat::new(5.0, 52.0)), Some(&nl_bounds())).unwrap();
    assert_eq!(bbox.to_wms_string(), "4.999,51.999,5.001,52.001");
}

#[test]
fn test_query_falls_back_to_bounds() {
    let bbox = BoundingBox::for_query(None, Some(&nl_bounds())).unwrap();
    assert_eq!(bbox.to_wms_string(), "4,51,6,53");
}

#[test]
fn test_query_without_selection() {
    assert!(BoundingBox::for_query(None, None).is_none());
}

// ============================================================================
// from_wms_string
// ============================================================================

#[test]
fn test_parse_wms_bbox_round_trip_string() {
    let bbox = BoundingBox::from_wms_string("4.999,51.999,5.001,52.001").unwrap();
    assert_eq!(bbox.to_wms_string(), "4.999,51.999,5.001,52.001");
}

#[test]
fn test_parse_wms_bbox_tolerates_spaces() {
    let bbox = BoundingBox::from_wms_string(" 4, 51, 6, 53 ").unwrap();
    assert_eq!(bbox, BoundingBox::new(4.0, 51.0, 6.0, 53.0));
}

#[test]
fn test_parse_wms_bbox_invalid_format_too_few() {
    let result = BoundingBox::from_wms_string("0,0,100");
    assert!(matches!(result, Err(BboxParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_wms_bbox_invalid_number() {
    let result = BoundingBox::from_wms_string("abc,0,100,100");
    assert!(matches!(result, Err(BboxParseError::InvalidNumber(_))));
}

#[test]
fn test_parse_error_converts_to_map_error() {
    let err: map_common::MapError = BoundingBox::from_wms_string("").unwrap_err().into();
    assert!(matches!(err, map_common::MapError::InvalidBbox(_)));
}
