//! Design documents installed in every todo database.
//!
//! The map functions are stored exactly as the mobile data SDK expects them;
//! existing databases already carry these bytes, so do not reformat them.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    /// Design document id without the `_design/` prefix.
    pub design: &'static str,
    pub name: &'static str,
    pub map: &'static str,
}

pub const LIST_DATA_TYPES: View = View {
    design: "_imfdata_listdatatypes",
    name: "listdatatypes",
    map: "function(doc) {\n    if (doc[\"@datatype\"]) {\n        emit(doc[\"@datatype\"], 1);\n    }\n}",
};

pub const KEY_COUNT_TYPED: View = View {
    design: "_imfdata_keycounttyped",
    name: "keyCountTyped",
    map: "function(doc) {\n    if (!doc.hasOwnProperty(\"@datatype\")) {\n        return;\n    }\n    var keys = Object.keys(doc);\n    for (var k in keys) {\n        key = keys[k];\n        if ([\"_id\", \"_rev\", \"@datatype\"].indexOf(key) == -1) {\n            emit([doc[\"@datatype\"], key], 1);\n        }\n    }\n}",
};

pub const KEY_COUNT_UNTYPED: View = View {
    design: "_imfdata_keycountuntyped",
    name: "keyCountUntyped",
    map: "function(doc) {\n    var keys = Object.keys(doc);\n    for (var k in keys) {\n        key = keys[k];\n        if ([\"_id\", \"_rev\", \"@datatype\"].indexOf(key) == -1) {\n            emit(key, 1);\n        }\n    }\n}",
};

/// Installed in this order.
pub const VIEWS: [View; 3] = [LIST_DATA_TYPES, KEY_COUNT_TYPED, KEY_COUNT_UNTYPED];

pub const DATATYPE_FIELD: &str = "@datatype";
pub const DATATYPE_INDEX_DESIGN: &str = "_imfdata_defaultdatatype";

impl View {
    #[must_use]
    pub fn document(&self) -> Value {
        let mut views = Map::new();
        views.insert(
            self.name.to_string(),
            json!({
                "map": self.map,
                "reduce": "_count",
            }),
        );
        json!({ "views": views })
    }
}

/// Cloudant Query index on `@datatype`.
#[must_use]
pub fn datatype_index() -> Value {
    json!({
        "index": { "fields": [DATATYPE_FIELD] },
        "ddoc": DATATYPE_INDEX_DESIGN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_document_shape() {
        let doc = LIST_DATA_TYPES.document();
        assert_eq!(
            doc,
            json!({
                "views": {
                    "listdatatypes": {
                        "map": "function(doc) {\n    if (doc[\"@datatype\"]) {\n        emit(doc[\"@datatype\"], 1);\n    }\n}",
                        "reduce": "_count"
                    }
                }
            })
        );
    }

    #[test]
    fn views_skip_reserved_keys() {
        for view in [KEY_COUNT_TYPED, KEY_COUNT_UNTYPED] {
            assert!(view.map.contains(r#"["_id", "_rev", "@datatype"]"#));
        }
        assert!(KEY_COUNT_TYPED.map.contains("emit([doc[\"@datatype\"], key], 1);"));
        assert!(KEY_COUNT_UNTYPED.map.contains("emit(key, 1);"));
        assert!(!KEY_COUNT_UNTYPED.map.contains("hasOwnProperty"));
    }

    #[test]
    fn views_are_installed_in_order() {
        let names: Vec<&str> = VIEWS.iter().map(|view| view.name).collect();
        assert_eq!(names, ["listdatatypes", "keyCountTyped", "keyCountUntyped"]);
    }

    #[test]
    fn index_definition() {
        assert_eq!(
            datatype_index(),
            json!({"index": {"fields": ["@datatype"]}, "ddoc": "_imfdata_defaultdatatype"})
        );
    }
}
