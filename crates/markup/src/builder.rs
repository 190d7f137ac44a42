use crate::error::{ParseError, ParseErrorCode};
use crate::tokenizer::{Token, tokenize};
use crate::tree::{NodeId, Tree};

/// Parse a view/template source into a tree rooted at a document node.
pub fn parse(input: &str) -> Result<Tree, ParseError> {
    let tokens = tokenize(input)?;
    build_tree(tokens)
}

pub fn build_tree(tokens: Vec<Token>) -> Result<Tree, ParseError> {
    let mut tree = Tree::new();
    let root = tree.root();
    let mut open_elements: Vec<(NodeId, usize)> = Vec::new();

    for token in tokens {
        let parent = open_elements.last().map_or(root, |(id, _)| *id);
        match token {
            Token::Text(text) => {
                let node = tree.create_text(&text);
                attach(&mut tree, parent, node);
            }
            Token::Comment(text) => {
                let node = tree.create_comment(&text);
                attach(&mut tree, parent, node);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
                position,
            } => {
                let node = tree.create_element(&name, attributes);
                attach(&mut tree, parent, node);
                if !self_closing {
                    open_elements.push((node, position));
                }
            }
            Token::EndTag { name, position } => match open_elements.pop() {
                Some((open, _)) if tree.is_element_named(open, &name) => {}
                _ => {
                    return Err(ParseError {
                        code: ParseErrorCode::UnexpectedEndTag,
                        position,
                    });
                }
            },
        }
    }

    if let Some((_, position)) = open_elements.pop() {
        return Err(ParseError {
            code: ParseErrorCode::UnclosedElement,
            position,
        });
    }
    log::trace!(target: "markup.parse", "built tree with {} nodes", tree.len());
    Ok(tree)
}

fn attach(tree: &mut Tree, parent: NodeId, node: NodeId) {
    // Fresh nodes under an open element or the document node can always be appended.
    let appended = tree.append_child(parent, node);
    debug_assert!(appended.is_ok(), "builder append failed: {appended:?}");
}
