//! DOM 辅助模块
//!
//! 基于 `markup5ever_rcdom` 的文档操作工具：解析、序列化、属性读写、
//! 节点插入/移除以及文本节点遍历。节点身份以 `Rc` 指针地址表示
//! （[`NodeId`]），引擎在会话期间对每个被记录的节点持有强引用，
//! 因此地址在会话生命周期内保持唯一。

pub mod layout;

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::interface::{Attribute, QualName};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{namespace_url, ns, parse_document, LocalName};
use markup5ever_rcdom::{Node, SerializableHandle};
pub use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::{Result, TranslationError};

/// 文本节点的会话内身份标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn of(node: &Handle) -> Self {
        NodeId(Rc::as_ptr(node) as usize)
    }
}

/// 将 HTML 文本解析为 DOM
pub fn html_to_dom(html: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| TranslationError::Parse(format!("HTML解析失败: {}", e)))
}

/// 序列化 DOM 为 HTML 字符串
pub fn serialize_dom(document: &Handle) -> Result<String> {
    let mut buffer = Vec::new();
    serialize(
        &mut buffer,
        &SerializableHandle::from(document.clone()),
        SerializeOpts::default(),
    )
    .map_err(|e| TranslationError::Parse(format!("HTML序列化失败: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| TranslationError::Parse(format!("UTF-8转换失败: {}", e)))
}

/// 获取节点标签名
pub fn node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 设置节点属性；`None` 表示移除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: attr_value.as_str().into(),
                });
            }
        }
    }
}

/// 获取父节点
///
/// `parent` 是 `Cell<Option<Weak>>`，取出后必须放回，否则节点会
/// 永久失去父链接。
pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// 自下而上遍历祖先节点（不含节点自身）
pub fn ancestors_of(node: &Handle) -> Vec<Handle> {
    let mut chain = Vec::new();
    let mut current = parent_of(node);
    while let Some(parent) = current {
        current = parent_of(&parent);
        chain.push(parent);
    }
    chain
}

/// 判断节点是否仍连接在以 `root` 为根的文档树上
pub fn is_attached(node: &Handle, root: &Handle) -> bool {
    if Rc::ptr_eq(node, root) {
        return true;
    }
    let mut current = parent_of(node);
    while let Some(parent) = current {
        if Rc::ptr_eq(&parent, root) {
            return true;
        }
        current = parent_of(&parent);
    }
    false
}

/// 获取文本节点的内容
pub fn text_content(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆写文本节点的内容；非文本节点静默忽略
pub fn set_text(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        let mut contents = contents.borrow_mut();
        *contents = text.into();
    }
}

/// 创建元素节点
pub fn create_element(tag: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(html), LocalName::from(*name)),
            value: (*value).into(),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

/// 在 `reference` 之前插入 `new_child`；`reference` 不在子节点列表中时返回 false
pub fn insert_before(parent: &Handle, reference: &Handle, new_child: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, reference)) {
        Some(pos) => {
            new_child.parent.set(Some(Rc::downgrade(parent)));
            children.insert(pos, new_child.clone());
            true
        }
        None => false,
    }
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 移除子节点；`child` 不在子节点列表中时返回 false
pub fn remove_child(parent: &Handle, child: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, child)) {
        Some(pos) => {
            children.remove(pos);
            child.parent.set(None);
            true
        }
        None => false,
    }
}

/// 原位替换子节点；`old` 不在子节点列表中时返回 false
pub fn replace_child(parent: &Handle, old: &Handle, new: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, old)) {
        Some(pos) => {
            new.parent.set(Some(Rc::downgrade(parent)));
            children[pos] = new.clone();
            old.parent.set(None);
            true
        }
        None => false,
    }
}

/// 复制当前子节点列表（遍历期间安全地进行结构修改）
pub fn children_snapshot(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

/// 按文档顺序收集所有文本节点
pub fn collect_text_nodes(root: &Handle) -> Vec<Handle> {
    let mut nodes = Vec::new();
    walk_collect(root, &mut |node| {
        if matches!(node.data, NodeData::Text { .. }) {
            nodes.push(node.clone());
        }
    });
    nodes
}

/// 按文档顺序收集指定标签名的元素
pub fn collect_elements(root: &Handle, tag: &str) -> Vec<Handle> {
    let mut nodes = Vec::new();
    walk_collect(root, &mut |node| {
        if node_name(node) == Some(tag) {
            nodes.push(node.clone());
        }
    });
    nodes
}

/// 按文档顺序收集携带指定属性的元素
pub fn collect_elements_with_attr(root: &Handle, attr_name: &str) -> Vec<Handle> {
    let mut nodes = Vec::new();
    walk_collect(root, &mut |node| {
        if get_node_attr(node, attr_name).is_some() {
            nodes.push(node.clone());
        }
    });
    nodes
}

fn walk_collect(node: &Handle, visit: &mut dyn FnMut(&Handle)) {
    visit(node);
    for child in children_snapshot(node) {
        walk_collect(&child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> RcDom {
        html_to_dom(html).unwrap()
    }

    #[test]
    fn test_text_node_roundtrip() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let texts = collect_text_nodes(&dom.document);
        assert_eq!(texts.len(), 1);
        assert_eq!(text_content(&texts[0]).unwrap(), "Hello");

        set_text(&texts[0], "Bonjour");
        assert_eq!(text_content(&texts[0]).unwrap(), "Bonjour");
    }

    #[test]
    fn test_parent_link_survives_lookup() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let text = collect_text_nodes(&dom.document).remove(0);

        // 连续两次访问父节点都必须成功（take/set 回填）
        assert!(parent_of(&text).is_some());
        assert!(parent_of(&text).is_some());
        assert_eq!(node_name(&parent_of(&text).unwrap()), Some("p"));
    }

    #[test]
    fn test_is_attached_after_removal() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let text = collect_text_nodes(&dom.document).remove(0);
        let p = parent_of(&text).unwrap();

        assert!(is_attached(&text, &dom.document));
        assert!(remove_child(&p, &text));
        assert!(!is_attached(&text, &dom.document));
    }

    #[test]
    fn test_insert_before_and_replace() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let text = collect_text_nodes(&dom.document).remove(0);
        let p = parent_of(&text).unwrap();

        let marker = create_element("glossia-loading", &[]);
        assert!(insert_before(&p, &text, &marker));
        assert_eq!(children_snapshot(&p).len(), 2);
        assert_eq!(node_name(&children_snapshot(&p)[0]), Some("glossia-loading"));

        let replacement = create_text("Bonjour");
        assert!(replace_child(&p, &text, &replacement));
        assert!(!is_attached(&text, &dom.document));
        assert!(is_attached(&replacement, &dom.document));
    }

    #[test]
    fn test_attr_set_and_remove() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let text = collect_text_nodes(&dom.document).remove(0);
        let p = parent_of(&text).unwrap();

        set_node_attr(&p, "data-glossia-translated", Some("1".to_string()));
        assert_eq!(
            get_node_attr(&p, "data-glossia-translated").as_deref(),
            Some("1")
        );
        assert_eq!(collect_elements_with_attr(&dom.document, "data-glossia-translated").len(), 1);

        set_node_attr(&p, "data-glossia-translated", None);
        assert!(get_node_attr(&p, "data-glossia-translated").is_none());
    }

    #[test]
    fn test_serialize_contains_mutation() {
        let dom = parse("<html><body><p>Hello</p></body></html>");
        let text = collect_text_nodes(&dom.document).remove(0);
        set_text(&text, "Bonjour");

        let html = serialize_dom(&dom.document).unwrap();
        assert!(html.contains("Bonjour"));
        assert!(!html.contains("Hello"));
    }
}
