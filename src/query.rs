//! Query and result views passed across the boundary.
//!
//! These are the payload types a handler receives ([`CannedQuery`] for
//! search, a result for preview) and the types it pushes back
//! ([`CategorisedResult`], [`PreviewWidget`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::filters::FilterState;
use crate::handle::SharedHandle;

/// The query a search request was issued with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CannedQuery {
    scope_id: String,
    query_string: String,
    #[serde(default)]
    department_id: String,
    #[serde(default)]
    filter_state: FilterState,
}

impl CannedQuery {
    pub fn new(scope_id: &str, query_string: &str, department_id: &str) -> Self {
        Self {
            scope_id: scope_id.to_string(),
            query_string: query_string.to_string(),
            department_id: department_id.to_string(),
            filter_state: FilterState::new(),
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn department_id(&self) -> &str {
        &self.department_id
    }

    pub fn set_query_string(&mut self, query: &str) {
        self.query_string = query.to_string();
    }

    pub fn set_department_id(&mut self, department: &str) {
        self.department_id = department.to_string();
    }

    /// Selection state the user had active when issuing this query.
    pub fn filter_state(&self) -> &FilterState {
        &self.filter_state
    }

    pub fn set_filter_state(&mut self, state: FilterState) {
        self.filter_state = state;
    }
}

/// Category payload shared with the host runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryData {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub renderer_template: String,
}

/// Handle to a registered results category.
///
/// Returned by `SearchReply::register_category`; aliases the category
/// resource the runtime holds, so it stays valid for the lifetime of any
/// result built from it.
pub type Category = SharedHandle<CategoryData>;

/// A search result attached to a registered category.
///
/// Standard fields (uri, title, art, dnd_uri) have dedicated setters;
/// anything else goes through [`set_attr`](Self::set_attr) as a typed
/// attribute. Serializes to a flat field-named document carrying the
/// category id.
#[derive(Debug, Clone)]
pub struct CategorisedResult {
    category: Category,
    uri: String,
    title: String,
    art: String,
    dnd_uri: String,
    attrs: BTreeMap<String, Value>,
}

impl CategorisedResult {
    /// Create an empty result in the given category.
    pub fn new(category: &Category) -> Self {
        Self {
            category: category.clone(),
            uri: String::new(),
            title: String::new(),
            art: String::new(),
            dnd_uri: String::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: &str) -> &mut Self {
        self.uri = uri.to_string();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn art(&self) -> &str {
        &self.art
    }

    pub fn set_art(&mut self, art: &str) -> &mut Self {
        self.art = art.to_string();
        self
    }

    pub fn dnd_uri(&self) -> &str {
        &self.dnd_uri
    }

    pub fn set_dnd_uri(&mut self, dnd_uri: &str) -> &mut Self {
        self.dnd_uri = dnd_uri.to_string();
        self
    }

    /// Attach an arbitrary typed attribute.
    ///
    /// Fails with a serialization error if the value cannot be encoded
    /// (e.g. a non-finite float); the result is left unchanged.
    pub fn set_attr<T: Serialize>(&mut self, key: &str, value: T) -> Result<&mut Self> {
        let value = JsonCodec::to_value(&value)?;
        self.attrs.insert(key.to_string(), value);
        Ok(self)
    }

    /// A previously attached attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Serialize to the flat document pushed over the boundary.
    pub fn serialize(&self) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert("cat_id".into(), json!(self.category.id));
        doc.insert("uri".into(), json!(self.uri));
        doc.insert("title".into(), json!(self.title));
        doc.insert("art".into(), json!(self.art));
        doc.insert("dnd_uri".into(), json!(self.dnd_uri));
        for (key, value) in &self.attrs {
            doc.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(doc))
    }
}

/// A widget composing the preview of a result.
///
/// Attribute *values* are fixed in the widget; attribute *mappings* name a
/// result attribute the runtime resolves later, which lets a widget go out
/// early and be filled in once `push_attr` supplies the value.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewWidget {
    id: String,
    widget_type: String,
    attributes: BTreeMap<String, Value>,
    components: BTreeMap<String, String>,
}

impl PreviewWidget {
    /// Create a widget of the given type (e.g. `"header"`, `"image"`).
    pub fn new(id: &str, widget_type: &str) -> Self {
        Self {
            id: id.to_string(),
            widget_type: widget_type.to_string(),
            attributes: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn widget_type(&self) -> &str {
        &self.widget_type
    }

    /// Fix an attribute to a concrete value.
    pub fn add_attribute_value<T: Serialize>(&mut self, key: &str, value: T) -> Result<&mut Self> {
        let value = JsonCodec::to_value(&value)?;
        self.attributes.insert(key.to_string(), value);
        Ok(self)
    }

    /// Map an attribute to a field of the previewed result.
    pub fn add_attribute_mapping(&mut self, key: &str, field_name: &str) -> &mut Self {
        self.components
            .insert(key.to_string(), field_name.to_string());
        self
    }

    /// Serialize to the document pushed over the boundary.
    pub fn serialize(&self) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert("id".into(), json!(self.id));
        doc.insert("type".into(), json!(self.widget_type));
        for (key, value) in &self.attributes {
            doc.insert(key.clone(), value.clone());
        }
        if !self.components.is_empty() {
            doc.insert("components".into(), serde_json::to_value(&self.components)?);
        }
        Ok(Value::Object(doc))
    }
}
