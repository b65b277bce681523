use crate::config::{DOC_EXTENSION, MAX_FILE_NAME_BYTES};
use crate::join::{Document, JoinResult, Membership, RequiredPages};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Cc}").unwrap());

/// Why a title or category name has no usable path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    Empty,
    DotName,
    TooLong,
    /// Another title already sanitizes to the same path.
    Collision,
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathRejection::Empty => "name is empty after sanitizing",
            PathRejection::DotName => "name is a relative directory reference",
            PathRejection::TooLong => "name exceeds the file name length limit",
            PathRejection::Collision => "path is already taken by another title",
        };
        f.write_str(s)
    }
}

/// Maps a title onto a single path component: `/` becomes `___`, control characters are dropped.
/// Not injective; the planner rejects a second title that lands on a taken path.
pub fn sanitize_component(name: &str) -> Result<String, PathRejection> {
    let cleaned = CONTROL_CHARS.replace_all(name, "").replace('/', "___");
    if cleaned.is_empty() {
        Err(PathRejection::Empty)
    } else if cleaned == "." || cleaned == ".." {
        Err(PathRejection::DotName)
    } else if cleaned.len() > MAX_FILE_NAME_BYTES {
        Err(PathRejection::TooLong)
    } else {
        Ok(cleaned)
    }
}

pub fn file_name(title: &str) -> Result<String, PathRejection> {
    let name = format!("{}.{}", sanitize_component(title)?, DOC_EXTENSION);
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(PathRejection::TooLong);
    }
    Ok(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<'a> {
    Category(&'a str),
    Root,
}

/// One file the sink should produce. `target` is relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite<'a> {
    pub title: &'a str,
    pub placement: Placement<'a>,
    pub target: Result<PathBuf, PathRejection>,
    pub text: &'a str,
}

#[derive(Debug, Default)]
pub struct OutputPlan<'a> {
    pub writes: Vec<PlannedWrite<'a>>,
}

impl OutputPlan<'_> {
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

fn target_for(placement: Placement<'_>, title: &str) -> Result<PathBuf, PathRejection> {
    let file = file_name(title)?;
    match placement {
        Placement::Category(category) => Ok(PathBuf::from(sanitize_component(category)?).join(file)),
        Placement::Root => Ok(PathBuf::from(file)),
    }
}

struct Planner<'p, 'a> {
    documents: &'p [Document<'a>],
    planned: FxHashMap<PathBuf, &'a str>,
    writes: Vec<PlannedWrite<'a>>,
}

impl<'a> Planner<'_, 'a> {
    fn push(&mut self, pos: usize, placement: Placement<'a>) {
        let documents = self.documents;
        let doc = &documents[pos];
        let page = doc.page;
        let title = page.page_title.as_str();
        let mut target = target_for(placement, title);
        let mut collides = false;
        if let Ok(path) = &target {
            match self.planned.get(path) {
                Some(&owner) if owner == title => {
                    debug!(path = ?path, "Path already planned for this page");
                    return;
                }
                Some(&owner) => {
                    warn!(title, taken_by = owner, path = ?path, "Sanitized path collides");
                    collides = true;
                }
                None => {
                    self.planned.insert(path.clone(), title);
                }
            }
        }
        if collides {
            target = Err(PathRejection::Collision);
        }
        self.writes.push(PlannedWrite {
            title,
            placement,
            target,
            text: doc.text,
        });
    }
}

/// Category members first, one file per membership; whatever is still required afterwards
/// goes to the root, in title order. Takes the required set by value and drains it.
pub fn plan<'a>(
    documents: &[Document<'a>],
    memberships: &[Membership<'a>],
    mut required: RequiredPages<'a>,
) -> OutputPlan<'a> {
    let mut planner = Planner {
        documents,
        planned: FxHashMap::default(),
        writes: Vec::with_capacity(memberships.len() + required.len()),
    };

    let mut attempted: Vec<&str> = Vec::with_capacity(memberships.len());
    for m in memberships {
        planner.push(m.page, Placement::Category(m.category));
        attempted.push(documents[m.page].title());
    }

    for title in attempted {
        required.remove(title);
    }

    let in_categories = planner.writes.len();
    for (_, pos) in required {
        planner.push(pos, Placement::Root);
    }

    info!(
        category_files = in_categories,
        root_files = planner.writes.len() - in_categories,
        "Output planned"
    );

    OutputPlan {
        writes: planner.writes,
    }
}

/// Plans the output for a join, working on a copy of its required set.
pub fn plan_join<'a>(join: &JoinResult<'a>) -> OutputPlan<'a> {
    plan(&join.documents, &join.memberships, join.required.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;

    fn pages(titles: &[&str]) -> Vec<Page> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Page {
                page_id: i as u64 + 1,
                page_title: t.to_string(),
                page_latest: None,
            })
            .collect()
    }

    fn documents<'a>(pages: &'a [Page], texts: &[&'a str]) -> Vec<Document<'a>> {
        pages
            .iter()
            .zip(texts.iter().copied())
            .map(|(page, text)| Document {
                page,
                text,
                links: Vec::new(),
            })
            .collect()
    }

    fn paths(plan: &OutputPlan<'_>) -> Vec<String> {
        plan.writes
            .iter()
            .map(|w| w.target.as_ref().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn sanitize_replaces_slashes() {
        assert_eq!(sanitize_component("AC/DC").unwrap(), "AC___DC");
    }

    #[test]
    fn sanitize_drops_control_characters() {
        assert_eq!(sanitize_component("Tab\there\n").unwrap(), "Tabhere");
    }

    #[test]
    fn sanitize_rejects_unrepresentable_names() {
        assert_eq!(sanitize_component(""), Err(PathRejection::Empty));
        assert_eq!(sanitize_component("\u{7}"), Err(PathRejection::Empty));
        assert_eq!(sanitize_component(".."), Err(PathRejection::DotName));
        assert_eq!(sanitize_component(&"x".repeat(300)), Err(PathRejection::TooLong));
    }

    #[test]
    fn file_name_adds_extension_within_limit() {
        assert_eq!(file_name("Dog").unwrap(), "Dog.mediawiki");
        let long = "x".repeat(MAX_FILE_NAME_BYTES - 5);
        assert_eq!(file_name(&long), Err(PathRejection::TooLong));
    }

    #[test]
    fn category_members_are_not_repeated_at_root() {
        let ps = pages(&["Dog", "Cat"]);
        let docs = documents(&ps, &["Dogs bark.", "Cats purr."]);
        let memberships = vec![Membership {
            category: "Animals",
            page: 0,
        }];
        let required: RequiredPages = [("Dog", 0), ("Cat", 1)].into_iter().collect();

        let plan = plan(&docs, &memberships, required);
        assert_eq!(paths(&plan), vec!["Animals/Dog.mediawiki", "Cat.mediawiki"]);
        assert_eq!(plan.writes[0].placement, Placement::Category("Animals"));
        assert_eq!(plan.writes[1].placement, Placement::Root);
        assert_eq!(plan.writes[1].text, "Cats purr.");
    }

    #[test]
    fn page_in_several_categories_gets_one_file_each() {
        let ps = pages(&["Dog"]);
        let docs = documents(&ps, &["Dogs bark."]);
        let memberships = vec![
            Membership {
                category: "Animals",
                page: 0,
            },
            Membership {
                category: "Pets",
                page: 0,
            },
            Membership {
                category: "Animals",
                page: 0,
            },
        ];
        let required: RequiredPages = [("Dog", 0)].into_iter().collect();

        let plan = plan(&docs, &memberships, required);
        assert_eq!(paths(&plan), vec!["Animals/Dog.mediawiki", "Pets/Dog.mediawiki"]);
    }

    #[test]
    fn root_pages_are_in_title_order() {
        let ps = pages(&["Zebra", "Ant", "Moose"]);
        let docs = documents(&ps, &["z", "a", "m"]);
        let required: RequiredPages = [("Zebra", 0), ("Ant", 1), ("Moose", 2)]
            .into_iter()
            .collect();

        let plan = plan(&docs, &[], required);
        assert_eq!(
            paths(&plan),
            vec!["Ant.mediawiki", "Moose.mediawiki", "Zebra.mediawiki"]
        );
    }

    #[test]
    fn unrepresentable_title_is_planned_as_rejection() {
        let ps = pages(&[".."]);
        let docs = documents(&ps, &["text"]);
        let required: RequiredPages = [("..", 0)].into_iter().collect();

        let plan = plan(&docs, &[], required);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.writes[0].target, Err(PathRejection::DotName));
    }

    #[test]
    fn empty_text_is_still_planned() {
        let ps = pages(&["Stub"]);
        let docs = documents(&ps, &[""]);
        let memberships = vec![Membership {
            category: "Stubs",
            page: 0,
        }];
        let plan = plan(&docs, &memberships, RequiredPages::new());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.writes[0].text, "");
    }

    #[test]
    fn titles_sanitizing_to_one_path_do_not_share_a_file() {
        let ps = pages(&["AC/DC", "AC___DC"]);
        let docs = documents(&ps, &["band", "other page"]);
        let required: RequiredPages = [("AC/DC", 0), ("AC___DC", 1)].into_iter().collect();

        let plan = plan(&docs, &[], required);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.writes[0].title, "AC/DC");
        assert_eq!(plan.writes[0].target, Ok(PathBuf::from("AC___DC.mediawiki")));
        assert_eq!(plan.writes[1].title, "AC___DC");
        assert_eq!(plan.writes[1].target, Err(PathRejection::Collision));
    }

    #[test]
    fn colliding_category_members_are_rejected() {
        let ps = pages(&["A/B", "A___B"]);
        let docs = documents(&ps, &["first", "second"]);
        let memberships = vec![
            Membership {
                category: "Letters",
                page: 0,
            },
            Membership {
                category: "Letters",
                page: 1,
            },
        ];
        let plan = plan(&docs, &memberships, RequiredPages::new());
        assert_eq!(plan.writes[0].target, Ok(PathBuf::from("Letters/A___B.mediawiki")));
        assert_eq!(plan.writes[1].target, Err(PathRejection::Collision));
    }
}
