//! Document facade.
//!
//! In-memory node tree standing in for the host DOM: node creation,
//! insertion and removal, attribute/class/style access, surgical
//! character-data replacement, event listeners with dispatch, and per-node
//! bounding rects. Mutation counters and an `inner_html` serializer exist
//! for tests to observe exactly what the engine touched.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::value::Value;

/// Listener handle used for removal.
pub type ListenerId = u64;

pub type ListenerFn = Rc<dyn Fn(&Value)>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

struct Listener {
    id: ListenerId,
    event: String,
    handler: ListenerFn,
}

struct NodeData {
    kind: NodeKind,
    tag: String,
    namespace: Option<String>,
    text: String,
    attributes: IndexMap<String, String>,
    classes: IndexSet<String>,
    styles: IndexMap<String, String>,
    listeners: Vec<Listener>,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<NodeRef>,
    rect: Option<Rect>,
    counters: Rc<RefCell<Counters>>,
}

#[derive(Debug, Default)]
struct Counters {
    mutations: u64,
    text_mutations: u64,
    next_listener_id: ListenerId,
}

/// Shared handle to one node. Equality is node identity.
#[derive(Clone)]
pub struct NodeRef {
    inner: Rc<RefCell<NodeData>>,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        match data.kind {
            NodeKind::Element => write!(f, "<{}>", data.tag),
            NodeKind::Text => write!(f, "#text({:?})", data.text),
            NodeKind::Comment => write!(f, "#comment({:?})", data.text),
        }
    }
}

/// The in-memory document: node factory plus mutation accounting.
#[derive(Clone)]
pub struct Document {
    counters: Rc<RefCell<Counters>>,
    body: NodeRef,
}

impl Document {
    pub fn new() -> Self {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let body = NodeRef {
            inner: Rc::new(RefCell::new(NodeData {
                kind: NodeKind::Element,
                tag: "body".to_string(),
                namespace: None,
                text: String::new(),
                attributes: IndexMap::new(),
                classes: IndexSet::new(),
                styles: IndexMap::new(),
                listeners: Vec::new(),
                parent: Weak::new(),
                children: Vec::new(),
                rect: None,
                counters: Rc::clone(&counters),
            })),
        };
        Document { counters, body }
    }

    pub fn body(&self) -> NodeRef {
        self.body.clone()
    }

    pub fn create_element(&self, tag: &str, namespace: Option<&str>) -> NodeRef {
        self.create(NodeKind::Element, tag, namespace, "")
    }

    pub fn create_text(&self, text: &str) -> NodeRef {
        self.create(NodeKind::Text, "", None, text)
    }

    pub fn create_comment(&self, text: &str) -> NodeRef {
        self.create(NodeKind::Comment, "", None, text)
    }

    fn create(&self, kind: NodeKind, tag: &str, namespace: Option<&str>, text: &str) -> NodeRef {
        NodeRef {
            inner: Rc::new(RefCell::new(NodeData {
                kind,
                tag: tag.to_string(),
                namespace: namespace.map(str::to_string),
                text: text.to_string(),
                attributes: IndexMap::new(),
                classes: IndexSet::new(),
                styles: IndexMap::new(),
                listeners: Vec::new(),
                parent: Weak::new(),
                children: Vec::new(),
                rect: None,
                counters: Rc::clone(&self.counters),
            })),
        }
    }

    /// Total structural/attribute/class/style/text mutations so far.
    pub fn mutation_count(&self) -> u64 {
        self.counters.borrow().mutations
    }

    /// Character-data replacements so far.
    pub fn text_mutation_count(&self) -> u64 {
        self.counters.borrow().text_mutations
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl NodeRef {
    pub fn kind(&self) -> NodeKind {
        self.inner.borrow().kind
    }

    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    pub fn namespace(&self) -> Option<String> {
        self.inner.borrow().namespace.clone()
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| NodeRef { inner })
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.inner.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    fn bump(&self) {
        let counters = Rc::clone(&self.inner.borrow().counters);
        counters.borrow_mut().mutations += 1;
    }

    /// Insert `node` as a child of `self`, before `anchor` (or at the end).
    pub fn insert_before(&self, node: &NodeRef, anchor: Option<&NodeRef>) {
        node.remove();
        let index = match anchor {
            Some(anchor) => self
                .inner
                .borrow()
                .children
                .iter()
                .position(|child| child == anchor)
                .unwrap_or_else(|| self.inner.borrow().children.len()),
            None => self.inner.borrow().children.len(),
        };
        self.inner.borrow_mut().children.insert(index, node.clone());
        node.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.bump();
    }

    pub fn append_child(&self, node: &NodeRef) {
        self.insert_before(node, None);
    }

    /// Detach from the parent; a no-op for parentless nodes.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .borrow_mut()
                .children
                .retain(|child| child != self);
            self.inner.borrow_mut().parent = Weak::new();
            self.bump();
        }
    }

    pub fn next_sibling(&self) -> Option<NodeRef> {
        let parent = self.parent()?;
        let siblings = parent.inner.borrow();
        let index = siblings.children.iter().position(|child| child == self)?;
        siblings.children.get(index + 1).cloned()
    }

    // Attributes

    pub fn set_attribute(&self, name: &str, value: &str) {
        let changed = {
            let mut data = self.inner.borrow_mut();
            data.attributes.insert(name.to_string(), value.to_string())
                != Some(value.to_string())
        };
        if changed {
            self.bump();
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    pub fn remove_attribute(&self, name: &str) {
        if self.inner.borrow_mut().attributes.shift_remove(name).is_some() {
            self.bump();
        }
    }

    // Classes

    pub fn add_class(&self, name: &str) {
        if self.inner.borrow_mut().classes.insert(name.to_string()) {
            self.bump();
        }
    }

    pub fn remove_class(&self, name: &str) {
        if self.inner.borrow_mut().classes.shift_remove(name) {
            self.bump();
        }
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.inner.borrow().classes.contains(name)
    }

    pub fn class_list(&self) -> Vec<String> {
        self.inner.borrow().classes.iter().cloned().collect()
    }

    // Styles

    pub fn set_style(&self, name: &str, value: &str) {
        let changed = {
            let mut data = self.inner.borrow_mut();
            data.styles.insert(name.to_string(), value.to_string()) != Some(value.to_string())
        };
        if changed {
            self.bump();
        }
    }

    pub fn remove_style(&self, name: &str) {
        if self.inner.borrow_mut().styles.shift_remove(name).is_some() {
            self.bump();
        }
    }

    pub fn get_style(&self, name: &str) -> Option<String> {
        self.inner.borrow().styles.get(name).cloned()
    }

    // Character data

    /// Surgical character-data replacement; never swaps the node.
    pub fn set_text(&self, text: &str) {
        let counters = {
            let mut data = self.inner.borrow_mut();
            if data.text == text {
                return;
            }
            data.text = text.to_string();
            Rc::clone(&data.counters)
        };
        let mut counters = counters.borrow_mut();
        counters.mutations += 1;
        counters.text_mutations += 1;
    }

    pub fn text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        let data = self.inner.borrow();
        match data.kind {
            NodeKind::Text => data.text.clone(),
            NodeKind::Comment => String::new(),
            NodeKind::Element => data
                .children
                .iter()
                .map(NodeRef::text_content)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    // Listeners

    pub fn add_listener(&self, event: &str, handler: ListenerFn) -> ListenerId {
        let id = {
            let data = self.inner.borrow();
            let mut counters = data.counters.borrow_mut();
            counters.next_listener_id += 1;
            counters.next_listener_id
        };
        self.inner.borrow_mut().listeners.push(Listener {
            id,
            event: event.to_string(),
            handler,
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|listener| listener.id != id);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.event == event)
            .count()
    }

    /// Invoke every handler registered for `event`. Handlers are snapshotted
    /// first so they may re-bind listeners while running.
    pub fn dispatch(&self, event: &str, payload: &Value) {
        let handlers: Vec<ListenerFn> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.event == event)
            .map(|listener| Rc::clone(&listener.handler))
            .collect();
        for handler in handlers {
            handler(payload);
        }
    }

    // Geometry

    pub fn set_rect(&self, rect: Rect) {
        self.inner.borrow_mut().rect = Some(rect);
    }

    /// Own rect, or the union of child rects.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let data = self.inner.borrow();
        if let Some(rect) = data.rect {
            return Some(rect);
        }
        let mut union: Option<Rect> = None;
        for child in &data.children {
            if let Some(rect) = child.bounding_rect() {
                union = Some(match union {
                    Some(current) => current.union(&rect),
                    None => rect,
                });
            }
        }
        union
    }

    // Queries

    /// Find the first descendant (or self) matching `tag`, `.class` or
    /// `#id`.
    pub fn query(&self, selector: &str) -> Option<NodeRef> {
        if self.matches(selector) {
            return Some(self.clone());
        }
        let children = self.children();
        for child in children {
            if let Some(found) = child.query(selector) {
                return Some(found);
            }
        }
        None
    }

    fn matches(&self, selector: &str) -> bool {
        let data = self.inner.borrow();
        if data.kind != NodeKind::Element {
            return false;
        }
        if let Some(class) = selector.strip_prefix('.') {
            return data.classes.contains(class);
        }
        if let Some(id) = selector.strip_prefix('#') {
            return data.attributes.get("id").map(String::as_str) == Some(id);
        }
        data.tag == selector
    }

    /// Serialize the subtree for assertions.
    pub fn inner_html(&self) -> String {
        self.children()
            .iter()
            .map(NodeRef::outer_html)
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn outer_html(&self) -> String {
        let data = self.inner.borrow();
        match data.kind {
            NodeKind::Text => data.text.clone(),
            NodeKind::Comment => format!("<!--{}-->", data.text),
            NodeKind::Element => {
                let mut out = format!("<{}", data.tag);
                if !data.classes.is_empty() {
                    out.push_str(&format!(
                        " class=\"{}\"",
                        data.classes.iter().cloned().collect::<Vec<_>>().join(" ")
                    ));
                }
                if !data.styles.is_empty() {
                    let styles = data
                        .styles
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    out.push_str(&format!(" style=\"{}\"", styles));
                }
                for (name, value) in &data.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, value));
                }
                out.push('>');
                drop(data);
                out.push_str(&self.inner_html());
                let data = self.inner.borrow();
                out.push_str(&format!("</{}>", data.tag));
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let doc = Document::new();
        let parent = doc.create_element("div", None);
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        parent.append_child(&a);
        parent.insert_before(&b, Some(&a));
        assert_eq!(parent.text_content(), "ba");
        a.remove();
        assert_eq!(parent.text_content(), "b");
    }

    #[test]
    fn test_set_text_counts_once() {
        let doc = Document::new();
        let text = doc.create_text("a");
        text.set_text("b");
        text.set_text("b");
        assert_eq!(doc.text_mutation_count(), 1);
    }

    #[test]
    fn test_dispatch() {
        use std::cell::Cell;
        let doc = Document::new();
        let node = doc.create_element("button", None);
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        node.add_listener("click", Rc::new(move |_| counter.set(counter.get() + 1)));
        node.dispatch("click", &Value::Null);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_rect_union() {
        let doc = Document::new();
        let parent = doc.create_element("div", None);
        let a = doc.create_element("span", None);
        let b = doc.create_element("span", None);
        a.set_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        b.set_rect(Rect::new(20.0, 5.0, 10.0, 10.0));
        parent.append_child(&a);
        parent.append_child(&b);
        assert_eq!(parent.bounding_rect(), Some(Rect::new(0.0, 0.0, 30.0, 15.0)));
    }
}
