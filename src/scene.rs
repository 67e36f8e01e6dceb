//! Script parsing: raw script text to an ordered list of scenes.
//!
//! A script is a sequence of paragraphs separated by blank lines. The first
//! line of each paragraph describes what the scene looks like, every line
//! after it is a line of dialogue to be narrated.

use serde::Serialize;

/// One paragraph of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene {
    /// First line of the paragraph. Drives image generation.
    pub description: String,
    /// Remaining lines of the paragraph, in source order.
    pub dialogues: Vec<String>,
}

impl Scene {
    pub fn new(description: impl Into<String>, dialogues: Vec<String>) -> Self {
        Self {
            description: description.into(),
            dialogues,
        }
    }
}

/// A line containing nothing but whitespace separates paragraphs.
fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Split `script` into scenes.
///
/// Runs of blank lines separate paragraphs. A line holding only spaces or
/// tabs counts as blank, so it splits scenes too. Each non-empty paragraph
/// yields exactly one scene; when `max_scenes` is set only the first
/// `max_scenes` scenes are kept. An empty script yields an empty list.
pub fn parse_script(script: &str, max_scenes: Option<usize>) -> Vec<Scene> {
    let limit = max_scenes.unwrap_or(usize::MAX);
    let mut scenes = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in script.lines() {
        if scenes.len() >= limit {
            break;
        }
        if is_blank(line) {
            if let Some(scene) = scene_from_block(&block) {
                scenes.push(scene);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }

    if scenes.len() < limit {
        if let Some(scene) = scene_from_block(&block) {
            scenes.push(scene);
        }
    }

    scenes
}

fn scene_from_block(block: &[&str]) -> Option<Scene> {
    let (description, dialogues) = block.split_first()?;
    Some(Scene {
        description: (*description).to_string(),
        dialogues: dialogues.iter().map(|line| line.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script_has_no_scenes() {
        assert!(parse_script("", None).is_empty());
        assert!(parse_script("\n\n\n", None).is_empty());
        assert!(parse_script("   \n\t\n", Some(3)).is_empty());
    }

    #[test]
    fn test_single_paragraph() {
        let scenes = parse_script("Forest intro", None);
        assert_eq!(scenes, vec![Scene::new("Forest intro", vec![])]);
    }

    #[test]
    fn test_description_and_dialogues() {
        let scenes = parse_script("Forest intro\n\nA fox speaks.\nHello there!", None);
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].description, "Forest intro");
        assert!(scenes[0].dialogues.is_empty());
        assert_eq!(scenes[1].description, "A fox speaks.");
        assert_eq!(scenes[1].dialogues, vec!["Hello there!".to_string()]);
    }

    #[test]
    fn test_dialogues_keep_order_and_duplicates() {
        let scenes = parse_script("Cave\nEcho!\nHello?\nEcho!\nEcho!", None);
        assert_eq!(
            scenes[0].dialogues,
            vec!["Echo!", "Hello?", "Echo!", "Echo!"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_runs_of_blank_lines_are_one_boundary() {
        let scenes = parse_script("A\n\n\n\nB\n  \n\t\nC\n", None);
        let descriptions: Vec<_> = scenes.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_whitespace_only_line_splits_scenes() {
        let scenes = parse_script("A forest\nHello\n   \nA river\nBye", None);
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0], Scene::new("A forest", vec!["Hello".to_string()]));
        assert_eq!(scenes[1], Scene::new("A river", vec!["Bye".to_string()]));
    }

    #[test]
    fn test_no_scene_has_an_empty_description() {
        let scenes = parse_script("\n\n\nfirst\n\n\n\nsecond\nline\n\n\n", None);
        assert_eq!(scenes.len(), 2);
        assert!(scenes.iter().all(|s| !s.description.is_empty()));
    }

    #[test]
    fn test_crlf_line_endings() {
        let scenes = parse_script("A\r\nsays hi\r\n\r\nB", None);
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].dialogues, vec!["says hi".to_string()]);
        assert_eq!(scenes[1].description, "B");
    }

    #[test]
    fn test_max_scenes_keeps_leading_scenes() {
        let script = "one\n\ntwo\n\nthree\n\nfour";
        let scenes = parse_script(script, Some(3));
        let descriptions: Vec<_> = scenes.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_max_scenes_larger_than_script() {
        assert_eq!(parse_script("one\n\ntwo", Some(10)).len(), 2);
    }

    #[test]
    fn test_max_scenes_zero() {
        assert!(parse_script("one\n\ntwo", Some(0)).is_empty());
    }

    #[test]
    fn test_scene_count_matches_paragraph_count() {
        for k in 0..8 {
            let script = (0..k)
                .map(|i| format!("scene {}\nline {}", i, i))
                .collect::<Vec<_>>()
                .join("\n\n");
            let scenes = parse_script(&script, None);
            assert_eq!(scenes.len(), k);
            for (i, scene) in scenes.iter().enumerate() {
                assert_eq!(scene.description, format!("scene {}", i));
            }
            assert_eq!(parse_script(&script, Some(2)).len(), k.min(2));
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let script = "Sunrise\nBird: Morning!\n\nNoon\n\nDusk\nOwl: Hoo.\nOwl: Hoo.";
        assert_eq!(parse_script(script, None), parse_script(script, None));
        assert_eq!(parse_script(script, Some(2)), parse_script(script, Some(2)));
    }
}
