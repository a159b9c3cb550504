//! Recursive key search over a [`DocumentTree`].
//!
//! Traversal is depth-first and pre-order: a mapping entry whose label matches
//! is recorded before its subtree is searched, and the subtree is still
//! searched, so nested matches of the same label are all reported. Sequences
//! are walked by index (`[i]`), mappings by label (`.label`, or `["label"]`
//! when the label itself holds path punctuation). The walk uses an
//! explicit work list rather than recursion.

use crate::tree::{push_label, DocumentTree};

/// A located node: its label, its path from the root, and its subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPathMatch<'a> {
    pub key: String,
    pub path: String,
    pub value: &'a DocumentTree,
}

/// Every node whose label is one of `keys`, in traversal order.
pub fn find_by_keys<'a>(tree: &'a DocumentTree, keys: &[&str]) -> Vec<KeyPathMatch<'a>> {
    let mut matches = Vec::new();
    walk(tree, |label, path, value| {
        if keys.contains(&label) {
            matches.push(KeyPathMatch {
                key: label.to_string(),
                path: path.to_string(),
                value,
            });
        }
    });
    matches
}

/// Paths of every node labelled `key`, in the same order as [`find_by_keys`].
pub fn find_paths(tree: &DocumentTree, key: &str) -> Vec<String> {
    let mut paths = Vec::new();
    walk(tree, |label, path, _| {
        if label == key {
            paths.push(path.to_string());
        }
    });
    paths
}

/// Visits every labelled mapping entry below `tree` in pre-order.
fn walk<'a>(tree: &'a DocumentTree, mut visit: impl FnMut(&'a str, &str, &'a DocumentTree)) {
    // (label of the entry if it came from a mapping, path, node)
    let mut work: Vec<(Option<&'a str>, String, &'a DocumentTree)> = vec![(None, String::new(), tree)];

    while let Some((label, path, node)) = work.pop() {
        if let Some(label) = label {
            visit(label, &path, node);
        }
        match node {
            DocumentTree::Scalar(_) => {}
            DocumentTree::Sequence(items) => {
                for (i, item) in items.iter().enumerate().rev() {
                    work.push((None, format!("{}[{}]", path, i), item));
                }
            }
            DocumentTree::Mapping(entries) => {
                for (key, value) in entries.iter().rev() {
                    let mut child_path = path.clone();
                    push_label(&mut child_path, key);
                    work.push((Some(key.as_str()), child_path, value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    const TRACKS: &str = r#"<Ableton>
        <LiveSet>
            <Tracks>
                <AudioTrack>
                    <DeviceChain>
                        <Devices>
                            <PluginDevice><PluginDesc><VstPluginInfo /></PluginDesc></PluginDevice>
                            <AudioEffectGroupDevice>
                                <Devices><Compressor2 /></Devices>
                            </AudioEffectGroupDevice>
                        </Devices>
                    </DeviceChain>
                </AudioTrack>
                <AudioTrack>
                    <DeviceChain><Devices><Eq8 /></Devices></DeviceChain>
                </AudioTrack>
            </Tracks>
        </LiveSet>
    </Ableton>"#;

    #[test]
    fn records_outer_match_before_nested_ones() {
        let tree = xml::parse(TRACKS).unwrap();
        let paths: Vec<String> = find_by_keys(&tree, &["Devices"])
            .into_iter()
            .map(|m| m.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "LiveSet.Tracks.AudioTrack[0].DeviceChain.Devices",
                "LiveSet.Tracks.AudioTrack[0].DeviceChain.Devices.AudioEffectGroupDevice.Devices",
                "LiveSet.Tracks.AudioTrack[1].DeviceChain.Devices",
            ]
        );
    }

    #[test]
    fn multiple_keys_interleave_in_traversal_order() {
        let tree = xml::parse(TRACKS).unwrap();
        let keys: Vec<String> = find_by_keys(&tree, &["PluginDesc", "Eq8", "Compressor2"])
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["PluginDesc", "Compressor2", "Eq8"]);
    }

    #[test]
    fn every_path_renavigates_to_its_value() {
        let tree = xml::parse(TRACKS).unwrap();
        let matches = find_by_keys(&tree, &["Devices", "AudioTrack", "PluginDesc", "VstPluginInfo"]);
        assert!(!matches.is_empty());
        for m in &matches {
            assert_eq!(tree.navigate(&m.path), Some(m.value), "path {}", m.path);
        }

        let dotted = xml::parse(
            r#"<Root><Group.Chain><Devices/><Devices Id="2"/></Group.Chain><A><Devices/></A></Root>"#,
        )
        .unwrap();
        let matches = find_by_keys(&dotted, &["Devices", "Group.Chain"]);
        let paths: Vec<&str> = matches.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                r#"["Group.Chain"]"#,
                r#"["Group.Chain"].Devices"#,
                "A.Devices",
            ]
        );
        for m in &matches {
            assert_eq!(dotted.navigate(&m.path), Some(m.value), "path {}", m.path);
        }
        assert_eq!(
            dotted.navigate(r#"["Group.Chain"].Devices[1].$.Id"#),
            Some(&DocumentTree::Scalar("2".to_string()))
        );
    }

    #[test]
    fn find_paths_matches_find_by_keys() {
        let tree = xml::parse(TRACKS).unwrap();
        let expected: Vec<String> = find_by_keys(&tree, &["Devices"])
            .into_iter()
            .map(|m| m.path)
            .collect();
        assert_eq!(find_paths(&tree, "Devices"), expected);
        assert!(find_paths(&tree, "Nope").is_empty());
    }

    #[test]
    fn scalars_end_the_branch() {
        let tree = DocumentTree::Scalar("just text".to_string());
        assert!(find_by_keys(&tree, &["anything"]).is_empty());
    }

    #[test]
    fn deep_nesting_does_not_exhaust_the_stack() {
        let depth = 3_000;
        let mut node = DocumentTree::Scalar("leaf".to_string());
        for _ in 0..depth {
            node = DocumentTree::Mapping(vec![("G".to_string(), node)]);
        }
        let matches = find_by_keys(&node, &["G"]);
        assert_eq!(matches.len(), depth);
        assert_eq!(matches[0].path, "G");
        assert_eq!(matches[1].path, "G.G");
    }
}
