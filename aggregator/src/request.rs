use combiner::AssetKind;
use indexmap::IndexMap;

/// One component's declaration of assets it needs on the page.
///
/// `attributes` keeps insertion order for rendering; equality between
/// declarations ignores that order (see [`AttributeSignature`]).
#[derive(Clone, Debug)]
pub struct AssetRequest {
    pub kind: AssetKind,
    /// Keys as declared, not yet deduped or sorted.
    pub keys: Vec<String>,
    pub attributes: IndexMap<String, String>,
    /// Whether other declarations may merge into this one.
    pub mergeable: bool,
    /// Whether this declaration may leave its declared location to
    /// merge into another.
    pub movable: bool,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            kind,
            keys: keys.into_iter().map(Into::into).collect(),
            attributes: IndexMap::new(),
            mergeable: true,
            movable: true,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn not_mergeable(mut self) -> Self {
        self.mergeable = false;
        self
    }

    pub fn not_movable(mut self) -> Self {
        self.movable = false;
        self
    }

    pub fn signature(&self) -> AttributeSignature {
        AttributeSignature::of(&self.attributes)
    }

    /// Attribute text in declared order, for tag rendering.
    pub fn render_attributes(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        out
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Order-stable serialization of a declaration's attributes, e.g.
/// `media="print"`. Two declarations are merge-compatible only when
/// their signatures are equal, whatever order the attributes were
/// inserted in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeSignature(String);

impl AttributeSignature {
    pub fn of(attributes: &IndexMap<String, String>) -> Self {
        let mut pairs: Vec<(&String, &String)> = attributes.iter().collect();
        pairs.sort_by_key(|(name, _)| *name);

        let rendered = pairs
            .iter()
            .map(|(name, value)| format!("{name}=\"{}\"", escape_attribute(value)))
            .collect::<Vec<_>>()
            .join(" ");
        AttributeSignature(rendered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
