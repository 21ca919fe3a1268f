//! The tree model queries run against.
use std::hash::Hash;

/// A resolved name. Name tests compare `namespace` and `local_part`; the
/// prefix is only reported by `name()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub local_part: &'a str,
}

impl<'a> QName<'a> {
    /// A name in no namespace.
    pub fn local(local_part: &'a str) -> Self {
        Self {
            prefix: None,
            namespace: None,
            local_part,
        }
    }

    pub fn qualified(prefix: &'a str, namespace: &'a str, local_part: &'a str) -> Self {
        Self {
            prefix: Some(prefix),
            namespace: Some(namespace),
            local_part,
        }
    }
}

/// The seven XPath 1.0 node kinds, minus namespace nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A cheap, copyable handle to a node of some tree.
///
/// `Ord` must follow document order, with attributes after their element and
/// before its children; node-sets are kept sorted and deduplicated with it.
pub trait DataSourceNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn node_type(&self) -> NodeType;

    /// Elements and attributes have names; a processing instruction reports
    /// its target as a local name. Everything else returns `None`.
    fn name(&self) -> Option<QName<'a>>;

    /// The XPath string-value: all descendant text for roots and elements,
    /// the value or content for everything else.
    fn string_value(&self) -> String;

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The owning element for attributes, `None` for the top of a tree.
    fn parent(&self) -> Option<Self>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cmp::Ordering;
    use std::hash::Hasher;

    pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
    pub const NOTE_NS: &str = "urn:example:notes";

    #[derive(Debug)]
    struct Entry {
        node_type: NodeType,
        name: Option<QName<'static>>,
        text: String,
        parent: Option<usize>,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    /// A tree whose node ids are handed out in document order, so comparing
    /// ids compares positions. Build it top-down: an element's attributes
    /// before its children.
    #[derive(Debug)]
    pub struct MockTree {
        entries: Vec<Entry>,
    }

    impl MockTree {
        pub fn new() -> Self {
            let root = Entry {
                node_type: NodeType::Root,
                name: None,
                text: String::new(),
                parent: None,
                children: Vec::new(),
                attributes: Vec::new(),
            };
            MockTree {
                entries: vec![root],
            }
        }

        fn push(
            &mut self,
            parent: usize,
            node_type: NodeType,
            name: Option<QName<'static>>,
            text: &str,
        ) -> usize {
            let id = self.entries.len();
            self.entries.push(Entry {
                node_type,
                name,
                text: text.to_string(),
                parent: Some(parent),
                children: Vec::new(),
                attributes: Vec::new(),
            });
            let owner = &mut self.entries[parent];
            if node_type == NodeType::Attribute {
                owner.attributes.push(id);
            } else {
                owner.children.push(id);
            }
            id
        }

        pub fn element(&mut self, parent: usize, name: QName<'static>) -> usize {
            self.push(parent, NodeType::Element, Some(name), "")
        }

        pub fn attribute(&mut self, owner: usize, name: QName<'static>, value: &str) -> usize {
            self.push(owner, NodeType::Attribute, Some(name), value)
        }

        pub fn text(&mut self, parent: usize, text: &str) -> usize {
            self.push(parent, NodeType::Text, None, text)
        }

        pub fn comment(&mut self, parent: usize, text: &str) -> usize {
            self.push(parent, NodeType::Comment, None, text)
        }

        pub fn instruction(&mut self, parent: usize, target: &'static str, text: &str) -> usize {
            self.push(
                parent,
                NodeType::ProcessingInstruction,
                Some(QName::local(target)),
                text,
            )
        }

        pub fn node(&self, id: usize) -> MockNode<'_> {
            MockNode { id, tree: self }
        }

        fn collect_text(&self, id: usize, out: &mut String) {
            for &child in &self.entries[id].children {
                match self.entries[child].node_type {
                    NodeType::Text => out.push_str(&self.entries[child].text),
                    NodeType::Element => self.collect_text(child, out),
                    _ => {}
                }
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        tree: &'a MockTree,
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for MockNode<'_> {}

    impl PartialOrd for MockNode<'_> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for MockNode<'_> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl Hash for MockNode<'_> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> DataSourceNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.entries[self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            self.tree.entries[self.id].name
        }

        fn string_value(&self) -> String {
            let entry = &self.tree.entries[self.id];
            match entry.node_type {
                NodeType::Root | NodeType::Element => {
                    let mut text = String::new();
                    self.tree.collect_text(self.id, &mut text);
                    text
                }
                _ => entry.text.clone(),
            }
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.entries[self.id]
                    .attributes
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.entries[self.id]
                    .children
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            let tree = self.tree;
            tree.entries[self.id]
                .parent
                .map(|id| MockNode { id, tree })
        }
    }

    /// ```text
    /// 0  /
    /// 1  <para id="p1" xml:lang="en">       2 @id, 3 @xml:lang
    /// 4    Hello
    /// 5  <!-- note -->
    /// 6  <div>
    /// 7    <n:note n:kind="memo">           8 @n:kind
    /// 9      Memo
    /// 10 <?render fast?>
    /// 11 <para>
    /// 12   World
    /// ```
    pub fn sample() -> MockTree {
        let mut tree = MockTree::new();
        let para = tree.element(0, QName::local("para"));
        tree.attribute(para, QName::local("id"), "p1");
        tree.attribute(para, QName::qualified("xml", XML_NS, "lang"), "en");
        tree.text(para, "Hello");
        tree.comment(0, " note ");
        let div = tree.element(0, QName::local("div"));
        let note = tree.element(div, QName::qualified("n", NOTE_NS, "note"));
        tree.attribute(note, QName::qualified("n", NOTE_NS, "kind"), "memo");
        tree.text(note, "Memo");
        tree.instruction(0, "render", "fast");
        let second = tree.element(0, QName::local("para"));
        tree.text(second, "World");
        tree
    }
}
