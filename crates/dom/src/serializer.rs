//! DOM Serializer - Convert the arena back into markup
//!
//! Output is indented one space per depth level, one node per line, so a
//! response body can be read by eye. Whitespace-sensitive elements
//! (`pre`, `textarea`) and raw-text elements (`script`, `style`,
//! `noscript`, ...) are written inline with their content untouched.
//!
//! The walk uses an explicit stack of frames, so nesting depth is bounded
//! by memory rather than by the thread stack. Indentation stops growing at
//! `SerializerConfig::max_indent_depth`.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::*;

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    pub indent: String,
    /// Depth past which lines are no longer indented further
    pub max_indent_depth: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            max_indent_depth: 64,
        }
    }
}

/// Pending work for the serializer walk
enum Frame {
    /// Node written on its own line(s) at a depth
    Block(NodeId, usize),
    /// Node inside preformatted content; `bool` marks raw text
    Inline(NodeId, bool),
    /// End tag of a block element, indented when the depth is set
    BlockEnd(NodeId, Option<usize>),
    /// End tag inside preformatted content
    InlineEnd(NodeId),
}

/// DOM Tree Serializer
pub struct DomSerializer {
    config: SerializerConfig,
}

impl DomSerializer {
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Serialize the live tree
    pub fn serialize(&self, arena: &DomArena) -> Result<String> {
        let mut output = String::with_capacity(4096);
        let Some(root_id) = arena.root_id() else {
            return Ok(output);
        };

        let mut stack = vec![Frame::Block(root_id, 0)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Block(node_id, depth) => {
                    self.write_block(arena, node_id, depth, &mut stack, &mut output)?
                }
                Frame::Inline(node_id, raw) => {
                    write_inline(arena, node_id, raw, &mut stack, &mut output)?
                }
                Frame::BlockEnd(node_id, depth) => {
                    if let Some(depth) = depth {
                        self.push_indent(depth, &mut output);
                    }
                    push_end_tag(arena.get(node_id)?, &mut output);
                    output.push('\n');
                }
                Frame::InlineEnd(node_id) => push_end_tag(arena.get(node_id)?, &mut output),
            }
        }

        Ok(output)
    }

    fn write_block(
        &self,
        arena: &DomArena,
        node_id: NodeId,
        depth: usize,
        stack: &mut Vec<Frame>,
        output: &mut String,
    ) -> Result<()> {
        let node = arena.get(node_id)?;

        match node.node_type {
            NodeType::Document => {
                stack.extend(node.children_ids.iter().rev().map(|&id| Frame::Block(id, depth)));
            }
            NodeType::DocumentType => {
                self.push_indent(depth, output);
                output.push_str("<!DOCTYPE ");
                output.push_str(&node.node_name);
                output.push_str(">\n");
            }
            NodeType::Comment => {
                self.push_indent(depth, output);
                push_comment(node, output);
                output.push('\n');
            }
            NodeType::Text => {
                let text = node.node_value.trim();
                if !text.is_empty() {
                    self.push_indent(depth, output);
                    push_escaped_text(text, output);
                    output.push('\n');
                }
            }
            NodeType::Element => {
                self.push_indent(depth, output);
                push_start_tag(node, output);

                let name = node.node_name.as_str();
                if VOID_ELEMENTS.contains(&name) {
                    output.push('\n');
                } else if PREFORMATTED_ELEMENTS.contains(&name) {
                    let raw = RAW_TEXT_ELEMENTS.contains(&name);
                    stack.push(Frame::BlockEnd(node_id, None));
                    stack.extend(node.children_ids.iter().rev().map(|&id| Frame::Inline(id, raw)));
                } else {
                    output.push('\n');
                    stack.push(Frame::BlockEnd(node_id, Some(depth)));
                    stack.extend(
                        node.children_ids
                            .iter()
                            .rev()
                            .map(|&id| Frame::Block(id, depth + 1)),
                    );
                }
            }
        }

        Ok(())
    }

    fn push_indent(&self, depth: usize, output: &mut String) {
        for _ in 0..depth.min(self.config.max_indent_depth) {
            output.push_str(&self.config.indent);
        }
    }
}

impl Default for DomSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a node without adding or trimming any whitespace
fn write_inline(
    arena: &DomArena,
    node_id: NodeId,
    raw: bool,
    stack: &mut Vec<Frame>,
    output: &mut String,
) -> Result<()> {
    let node = arena.get(node_id)?;

    match node.node_type {
        NodeType::Text if raw => output.push_str(&node.node_value),
        NodeType::Text => push_escaped_text(&node.node_value, output),
        NodeType::Comment => push_comment(node, output),
        NodeType::Element => {
            push_start_tag(node, output);
            if !VOID_ELEMENTS.contains(&node.node_name.as_str()) {
                stack.push(Frame::InlineEnd(node_id));
                stack.extend(node.children_ids.iter().rev().map(|&id| Frame::Inline(id, raw)));
            }
        }
        NodeType::Document | NodeType::DocumentType => {}
    }

    Ok(())
}

fn push_start_tag(node: &DomNode, output: &mut String) {
    output.push('<');
    output.push_str(&node.node_name);
    for (name, value) in node.attributes.iter() {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        push_escaped_attr(value, output);
        output.push('"');
    }
    output.push('>');
}

fn push_end_tag(node: &DomNode, output: &mut String) {
    output.push_str("</");
    output.push_str(&node.node_name);
    output.push('>');
}

fn push_comment(node: &DomNode, output: &mut String) {
    output.push_str("<!--");
    output.push_str(&node.node_value);
    output.push_str("-->");
}

fn push_escaped_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

fn push_escaped_attr(value: &str, output: &mut String) {
    for c in value.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}
