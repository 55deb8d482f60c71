//! Indented directory tree from a list of file paths.

#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&mut self, name: &str) -> &mut Node {
        let idx = match self.children.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.children.push(Node { name: name.to_string(), children: Vec::new() });
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }
}

/// Render `paths` beneath `root_label`, keeping the input order of siblings.
///
/// Pass paths through [`sort_paths`](super::pathsort::sort_paths) first for a
/// stable listing. Directories are suffixed with `/`.
pub fn render_tree<S: AsRef<str>>(root_label: &str, paths: &[S]) -> String {
    let mut root = Node::default();
    for path in paths {
        let mut node = &mut root;
        for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment);
        }
    }

    let mut lines = vec![format!("{}/", root_label.trim_end_matches('/'))];
    walk(&root, "", &mut lines);
    lines.join("\n")
}

fn walk(node: &Node, prefix: &str, lines: &mut Vec<String>) {
    let total = node.children.len();
    for (idx, child) in node.children.iter().enumerate() {
        let is_last = idx + 1 == total;
        let connector = if is_last { "└── " } else { "├── " };

        if child.children.is_empty() {
            lines.push(format!("{prefix}{connector}{}", child.name));
        } else {
            lines.push(format!("{prefix}{connector}{}/", child.name));
            let extension = if is_last { "    " } else { "│   " };
            walk(child, &format!("{prefix}{extension}"), lines);
        }
    }
}
