//! Plain-text rendering of members and the family forest.

use family_core::{FamilyNode, FamilyStore, Member};

/// Shown when there is nothing to draw.
pub const EMPTY_TREE: &str = "No root members. Add someone with `add`.";

fn label(member: &Member) -> String {
    format!("{} [{}] {}", member.name, member.id, member.gender.symbol())
}

fn node_line(node: &FamilyNode) -> String {
    match &node.spouse {
        Some(spouse) => format!("{} ═ {}", label(&node.member), label(spouse)),
        None => label(&node.member),
    }
}

fn render_children(children: &[FamilyNode], prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&format!("{prefix}{branch}{}\n", node_line(child)));
        render_children(&child.children, &format!("{prefix}{extension}"), out);
    }
}

/// Draw the forest with box-drawing connectors, one tree per root.
pub fn render_forest(forest: &[FamilyNode]) -> String {
    if forest.is_empty() {
        return format!("{EMPTY_TREE}\n");
    }

    let mut out = String::new();
    for (i, root) in forest.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&node_line(root));
        out.push('\n');
        render_children(&root.children, "", &mut out);
    }
    out
}

/// One-line summary of a member, in the style of a member card.
pub fn describe_member(store: &FamilyStore, member: &Member) -> String {
    let mut parts = vec![format!("[{}] {} ({})", member.id, member.name, member.gender)];

    if let Some(spouse) = store.spouse_of(member.id) {
        parts.push(format!("married to {}", spouse.name));
    }
    let parents: Vec<&str> = store
        .parents_of(member.id)
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    if !parents.is_empty() {
        parts.push(format!("child of {}", parents.join(" & ")));
    }
    match member.children.len() {
        0 => {}
        1 => parts.push("1 child".to_string()),
        n => parts.push(format!("{n} children")),
    }
    match (&member.dob, &member.dod) {
        (Some(dob), Some(dod)) => parts.push(format!("{dob} – {dod}")),
        (Some(dob), None) => parts.push(format!("born {dob}")),
        (None, Some(dod)) => parts.push(format!("died {dod}")),
        (None, None) => {}
    }
    if !member.description.is_empty() {
        parts.push(member.description.clone());
    }

    parts.join(" · ")
}

/// List members, one per line.
pub fn render_list<'a>(store: &FamilyStore, members: impl IntoIterator<Item = &'a Member>) -> String {
    let lines: Vec<String> = members
        .into_iter()
        .map(|m| describe_member(store, m))
        .collect();
    if lines.is_empty() {
        return "No matching members.\n".to_string();
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use family_core::materialize;
    use family_core::sample::sample_store;
    use family_core::{Attachment, Gender, MemberId, NewMember};

    #[test]
    fn test_render_sample_forest() {
        let rendered = render_forest(&materialize(&sample_store()));
        let expected = "\
Alice (mother) [1] ♀ ═ Bob (father) [2] ♂
├── Charlie [3] ♂
└── Dina [4] ♀ ═ Evan (spouse of Dina) [5] ♂
    └── Fay [6] ♀
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_multiple_roots() {
        let mut store = sample_store();
        store
            .add_member(NewMember::new("Zed", Gender::Other), Attachment::Root)
            .unwrap();

        let rendered = render_forest(&materialize(&store));
        assert!(rendered.ends_with("\n\nZed [7] ⚥\n"));
    }

    #[test]
    fn test_render_empty_forest() {
        assert_eq!(render_forest(&[]), format!("{EMPTY_TREE}\n"));
    }

    #[test]
    fn test_describe_member() {
        let store = sample_store();
        let dina = store.get(MemberId::new(4)).unwrap();

        assert_eq!(
            describe_member(&store, dina),
            "[4] Dina (female) · married to Evan (spouse of Dina) · child of Alice (mother) & Bob (father) · 1 child"
        );
    }

    #[test]
    fn test_render_empty_list() {
        let store = sample_store();
        assert_eq!(render_list(&store, store.find_by_name("nobody")), "No matching members.\n");
    }
}
