use serde_json::{json, Map, Value};

/// Builder for annotation documents
pub struct AnnotationBuilder {
    body: Value,
    target: Value,
    extra: Map<String, Value>,
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self {
            body: json!("Some body"),
            target: json!("http://example.com"),
            extra: Map::new(),
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn target(mut self, target: Value) -> Self {
        self.target = target;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!("Annotation"));
        out.insert("body".into(), self.body);
        out.insert("target".into(), self.target);
        out.extend(self.extra);
        Value::Object(out)
    }
}

impl Default for AnnotationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Annotation whose body is a single text value
pub fn text_annotation(text: &str) -> Value {
    AnnotationBuilder::new().body(json!(text)).build()
}

/// Collection document as stored by the CRUD layer
pub fn collection_data(label: &str) -> Value {
    json!({
        "type": ["BasicContainer", "AnnotationCollection"],
        "label": label
    })
}

/// Raw search parameters
pub fn items(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
