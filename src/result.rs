//! Normalized OCR output shared by every engine adapter.
//!
//! Backends disagree on almost everything: point order, float vs integer
//! coordinates, whether confidence exists at all. Everything is funneled
//! into [`OcrItem`]s so callers never see a backend-native shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default threshold used by [`OcrResult::filter_default`].
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// A quadrilateral bounding region: exactly 4 `(x, y)` points in
/// backend-native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad([[i32; 2]; 4]);

impl Quad {
    /// Build a quad from integer points. No rounding is involved, so clean
    /// integer input never takes a floating-point detour.
    pub fn new(points: [[i32; 2]; 4]) -> Self {
        Self(points)
    }

    /// Build a quad from floating-point points, rounding each coordinate
    /// independently to the nearest integer (half away from zero, the
    /// `f64::round` rule).
    pub fn from_f64(points: [[f64; 2]; 4]) -> Self {
        Self(points.map(|[x, y]| [x.round() as i32, y.round() as i32]))
    }

    /// Build a quad from backend JSON points, validating the 4-point shape.
    ///
    /// Returns `None` unless there are exactly 4 points of exactly 2
    /// coordinates each.
    pub fn try_from_points(points: &[Vec<f64>]) -> Option<Self> {
        if points.len() != 4 || points.iter().any(|p| p.len() != 2) {
            return None;
        }
        let mut out = [[0i32; 2]; 4];
        for (slot, point) in out.iter_mut().zip(points) {
            *slot = [point[0].round() as i32, point[1].round() as i32];
        }
        Some(Self(out))
    }

    /// Expand an axis-aligned rectangle into corner points, clockwise from
    /// the top-left. Used for backends that report `left/top/right/bottom`.
    pub fn from_rect(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self([[left, top], [right, top], [right, bottom], [left, bottom]])
    }

    /// The 4 corner points.
    pub fn points(&self) -> &[[i32; 2]; 4] {
        &self.0
    }
}

/// One recognized text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrItem {
    /// Recognized text content.
    pub text: String,
    /// Bounding quadrilateral, if the backend reports positions.
    #[serde(rename = "box")]
    pub bbox: Option<Quad>,
    /// Confidence score in `[0, 1]`, if the backend reports one.
    pub confidence: Option<f64>,
}

/// The ordered items produced by one `ocr()` call.
///
/// Immutable once constructed; filtering operations return new results.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    items: Vec<OcrItem>,
    default_confidence_threshold: f64,
}

impl OcrResult {
    /// Wrap items with the standard default threshold.
    pub fn new(items: Vec<OcrItem>) -> Self {
        Self::with_threshold(items, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    /// Wrap items with a caller-chosen default threshold.
    pub fn with_threshold(items: Vec<OcrItem>, default_confidence_threshold: f64) -> Self {
        Self {
            items,
            default_confidence_threshold,
        }
    }

    /// Structured items in the order the backend produced them.
    pub fn items(&self) -> &[OcrItem] {
        &self.items
    }

    /// Number of recognized items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Threshold used by [`filter_default`](Self::filter_default).
    pub fn default_confidence_threshold(&self) -> f64 {
        self.default_confidence_threshold
    }

    /// Keep only items whose confidence is present and `>= threshold`.
    ///
    /// Items without a confidence score are always dropped here, whatever
    /// the threshold; use [`items`](Self::items) to see them.
    pub fn filter_by_confidence(&self, threshold: f64) -> OcrResult {
        let items = self
            .items
            .iter()
            .filter(|item| matches!(item.confidence, Some(c) if c >= threshold))
            .cloned()
            .collect();
        Self::with_threshold(items, self.default_confidence_threshold)
    }

    /// [`filter_by_confidence`](Self::filter_by_confidence) at the stored
    /// default threshold.
    pub fn filter_default(&self) -> OcrResult {
        self.filter_by_confidence(self.default_confidence_threshold)
    }

    /// Just the text of every item, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.text.as_str()).collect()
    }

    /// Concatenate all item texts with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.texts().join(separator)
    }

    /// JSON array of structured items:
    /// `{"text": …, "box": [[x,y]×4]|null, "confidence": f|null}`.
    ///
    /// Non-ASCII text is emitted literally, not `\u`-escaped — OCR output
    /// is frequently non-Latin script.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.items)
    }

    /// JSON array of the raw text strings only.
    pub fn to_json_text_only(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.texts())
    }
}

impl fmt::Display for OcrResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, confidence: Option<f64>) -> OcrItem {
        OcrItem {
            text: text.to_string(),
            bbox: None,
            confidence,
        }
    }

    #[test]
    fn test_quad_from_f64_rounds_each_coordinate() {
        let quad = Quad::from_f64([[10.4, 5.6], [20.5, 5.6], [20.5, 15.5], [10.4, 15.5]]);
        assert_eq!(
            quad.points(),
            &[[10, 6], [21, 6], [21, 16], [10, 16]],
            "each coordinate rounds independently, halves away from zero"
        );
    }

    #[test]
    fn test_quad_integer_points_pass_through() {
        let points = [[3, 7], [19, 7], [19, 42], [3, 42]];
        assert_eq!(Quad::new(points).points(), &points);
    }

    #[test]
    fn test_quad_try_from_points_validates_shape() {
        let good = vec![
            vec![1.0, 2.0],
            vec![3.0, 2.0],
            vec![3.0, 4.0],
            vec![1.0, 4.0],
        ];
        assert_eq!(
            Quad::try_from_points(&good),
            Some(Quad::new([[1, 2], [3, 2], [3, 4], [1, 4]]))
        );

        let three_points = vec![vec![1.0, 2.0], vec![3.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(Quad::try_from_points(&three_points), None);

        let bad_point = vec![
            vec![1.0, 2.0],
            vec![3.0, 2.0, 9.0],
            vec![3.0, 4.0],
            vec![1.0, 4.0],
        ];
        assert_eq!(Quad::try_from_points(&bad_point), None);
    }

    #[test]
    fn test_quad_from_rect_corner_order() {
        let quad = Quad::from_rect(5, 10, 50, 30);
        assert_eq!(quad.points(), &[[5, 10], [50, 10], [50, 30], [5, 30]]);
    }

    #[test]
    fn test_filter_by_confidence_keeps_subset_in_order() {
        let result = OcrResult::new(vec![
            item("a", Some(0.9)),
            item("b", Some(0.4)),
            item("c", None),
            item("d", Some(0.8)),
        ]);

        let filtered = result.filter_by_confidence(0.8);
        assert_eq!(filtered.texts(), vec!["a", "d"]);
        for kept in filtered.items() {
            assert!(kept.confidence.unwrap() >= 0.8);
        }
        // The original result is untouched.
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_filter_excludes_missing_confidence_even_at_zero() {
        let result = OcrResult::new(vec![item("scored", Some(0.0)), item("unscored", None)]);
        assert_eq!(result.filter_by_confidence(0.0).texts(), vec!["scored"]);
    }

    #[test]
    fn test_filter_default_uses_stored_threshold() {
        let result = OcrResult::with_threshold(
            vec![item("lo", Some(0.5)), item("hi", Some(0.7))],
            0.6,
        );
        assert_eq!(result.filter_default().texts(), vec!["hi"]);
    }

    #[test]
    fn test_join_matches_separator_join_of_texts() {
        let result = OcrResult::new(vec![
            item("one", Some(0.9)),
            item("two", Some(0.9)),
            item("three", None),
        ]);
        assert_eq!(result.join(", "), result.texts().join(", "));
        assert_eq!(result.join(" "), "one two three");
        assert_eq!(result.to_string(), "one two three");
    }

    #[test]
    fn test_items_preserve_construction_order() {
        let items: Vec<OcrItem> = (0..5).map(|i| item(&format!("line{i}"), None)).collect();
        let result = OcrResult::new(items.clone());
        assert_eq!(result.items(), items.as_slice());
    }

    #[test]
    fn test_to_json_structured_shape() {
        let result = OcrResult::new(vec![OcrItem {
            text: "hello".to_string(),
            bbox: Some(Quad::from_rect(0, 0, 10, 5)),
            confidence: Some(0.75),
        }]);

        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "text": "hello",
                "box": [[0, 0], [10, 0], [10, 5], [0, 5]],
                "confidence": 0.75,
            }])
        );
    }

    #[test]
    fn test_to_json_null_fields_for_absent_box_and_confidence() {
        let result = OcrResult::new(vec![item("bare", None)]);
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"text": "bare", "box": null, "confidence": null}])
        );
    }

    #[test]
    fn test_to_json_preserves_non_ascii() {
        let result = OcrResult::new(vec![item("你好世界", Some(0.99))]);
        let json = result.to_json().unwrap();
        assert!(json.contains("你好世界"), "non-ASCII must not be escaped: {json}");

        let text_only = result.to_json_text_only().unwrap();
        assert_eq!(text_only, "[\"你好世界\"]");
    }
}
