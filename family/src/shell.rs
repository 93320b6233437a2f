//! Interactive shell for editing a tree.
//!
//! A simple line-oriented protocol, one command per line:
//! - `tree` draws the forest, `list [query]` lists members
//! - `add <root|spouse:ID|child:ID> <gender> <name...>` adds a member
//! - `rename <id> <name...>` and `describe <id> <text...>` edit one
//! - `delete <id>` removes one
//! - `help`, `quit`

use crate::render::{describe_member, render_forest, render_list};
use family_core::{Attachment, FamilySession, Gender, MemberId, MemberPatch, NewMember};
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Commands:
  tree                                      - Draw the family tree
  list [query]                              - List members, optionally filtered by name
  add <root|spouse:ID|child:ID> <gender> <name...>
                                            - Add a member (gender: male, female, other)
  rename <id> <name...>                     - Change a member's name
  describe <id> <text...>                   - Set a member's description
  delete <id>                               - Remove a member and unlink them
  help                                      - Show this help
  quit                                      - Exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Tree,
    List(Option<String>),
    Add {
        attachment: Attachment,
        gender: Gender,
        name: String,
    },
    Rename { id: MemberId, name: String },
    Describe { id: MemberId, text: String },
    Delete(MemberId),
    Help,
    Quit,
}

fn parse_id(word: Option<&str>) -> Result<MemberId, String> {
    let word = word.ok_or("missing member id")?;
    word.parse().map_err(|_| format!("invalid member id {word:?}"))
}

fn parse_attachment(word: &str) -> Result<Attachment, String> {
    if word.eq_ignore_ascii_case("root") {
        return Ok(Attachment::Root);
    }
    match word.split_once(':') {
        Some((kind, id)) if kind.eq_ignore_ascii_case("spouse") => {
            Ok(Attachment::Spouse(parse_id(Some(id))?))
        }
        Some((kind, id)) if kind.eq_ignore_ascii_case("child") => {
            Ok(Attachment::Child(parse_id(Some(id))?))
        }
        _ => Err(format!("invalid relation {word:?} (expected root, spouse:ID or child:ID)")),
    }
}

/// Split off the first whitespace-separated word.
fn next_word(s: &str) -> (Option<&str>, &str) {
    let s = s.trim_start();
    if s.is_empty() {
        return (None, s);
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (Some(word), rest.trim()),
        None => (Some(s), ""),
    }
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let (command, rest) = next_word(line);
    let Some(command) = command else {
        return Err("empty command".to_string());
    };

    match command.to_lowercase().as_str() {
        "tree" | "show" => Ok(ShellCommand::Tree),
        "list" | "ls" => Ok(ShellCommand::List(
            Some(rest.to_string()).filter(|q| !q.is_empty()),
        )),
        "add" => {
            let (relation, rest) = next_word(rest);
            let attachment = parse_attachment(relation.ok_or("missing relation")?)?;
            let (gender, name) = next_word(rest);
            let gender = gender
                .ok_or("missing gender")?
                .parse::<Gender>()
                .map_err(|e| e.to_string())?;
            Ok(ShellCommand::Add {
                attachment,
                gender,
                name: name.to_string(),
            })
        }
        "rename" => {
            let (id, name) = next_word(rest);
            Ok(ShellCommand::Rename {
                id: parse_id(id)?,
                name: name.to_string(),
            })
        }
        "describe" => {
            let (id, text) = next_word(rest);
            Ok(ShellCommand::Describe {
                id: parse_id(id)?,
                text: text.to_string(),
            })
        }
        "delete" | "rm" => Ok(ShellCommand::Delete(parse_id(next_word(rest).0)?)),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command {other:?} (try `help`)")),
    }
}

/// Apply a command and return the text to show.
async fn execute(session: &mut FamilySession, command: ShellCommand) -> String {
    let mut out = match command {
        ShellCommand::Tree => render_forest(&session.forest()),
        ShellCommand::List(query) => {
            let store = session.store();
            match query {
                Some(q) => render_list(store, store.find_by_name(&q)),
                None => render_list(store, store.all()),
            }
        }
        ShellCommand::Add {
            attachment,
            gender,
            name,
        } => {
            let missing_target = attachment
                .target()
                .filter(|t| !session.store().contains(*t));
            match session
                .add_member(NewMember::new(name, gender), attachment)
                .await
            {
                Ok(id) => {
                    let mut msg = String::new();
                    if let Some(target) = missing_target {
                        msg.push_str(&format!("[WARN] No member {target}; added unlinked\n"));
                    }
                    let store = session.store();
                    if let Some(member) = store.get(id) {
                        msg.push_str(&format!("[ADDED] {}\n", describe_member(store, member)));
                    }
                    msg
                }
                Err(e) => format!("[ERROR] {e}\n"),
            }
        }
        ShellCommand::Rename { id, name } => {
            match session.update_member(id, MemberPatch::new().name(name)).await {
                Ok(true) => format!("[UPDATED] member {id}\n"),
                Ok(false) => format!("[ERROR] No member {id}\n"),
                Err(e) => format!("[ERROR] {e}\n"),
            }
        }
        ShellCommand::Describe { id, text } => {
            match session
                .update_member(id, MemberPatch::new().description(text))
                .await
            {
                Ok(true) => format!("[UPDATED] member {id}\n"),
                Ok(false) => format!("[ERROR] No member {id}\n"),
                Err(e) => format!("[ERROR] {e}\n"),
            }
        }
        ShellCommand::Delete(id) => {
            if session.delete_member(id).await {
                format!("[DELETED] member {id}\n")
            } else {
                format!("[ERROR] No member {id}\n")
            }
        }
        ShellCommand::Help => format!("{HELP}\n"),
        ShellCommand::Quit => String::new(),
    };

    if let Some(e) = session.last_save_error() {
        out.push_str(&format!("[WARN] Changes not saved: {e}\n"));
    }
    out
}

/// Run the shell until `quit` or end of input.
pub async fn run_shell<R: BufRead, W: Write>(
    session: &mut FamilySession,
    input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(output, "=== Family Tree ({}) ===", session.location())?;
    writeln!(output, "{} members. Type `help` for commands.", session.store().len())?;
    writeln!(output)?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(ShellCommand::Quit) => {
                writeln!(output, "Goodbye!")?;
                break;
            }
            Ok(command) => {
                let text = execute(session, command).await;
                write!(output, "{text}")?;
            }
            Err(e) => writeln!(output, "[ERROR] {e}")?,
        }
        output.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use family_core::MemoryStorage;
    use std::io::Cursor;

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_line("add child:4 female Fay Junior"),
            Ok(ShellCommand::Add {
                attachment: Attachment::Child(MemberId::new(4)),
                gender: Gender::Female,
                name: "Fay Junior".to_string(),
            })
        );
        assert_eq!(
            parse_line("ADD root other Sam").map(|c| matches!(c, ShellCommand::Add { attachment: Attachment::Root, .. })),
            Ok(true)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("add sibling:3 male X").is_err());
        assert!(parse_line("add root robot X").is_err());
        assert!(parse_line("delete abc").is_err());
        assert!(parse_line("rename").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("tree"), Ok(ShellCommand::Tree));
        assert_eq!(parse_line("list"), Ok(ShellCommand::List(None)));
        assert_eq!(parse_line("list  ali "), Ok(ShellCommand::List(Some("ali".to_string()))));
        assert_eq!(parse_line("rm 3"), Ok(ShellCommand::Delete(MemberId::new(3))));
        assert_eq!(
            parse_line("rename 3 Charles  Xavier"),
            Ok(ShellCommand::Rename {
                id: MemberId::new(3),
                name: "Charles  Xavier".to_string()
            })
        );
        assert_eq!(parse_line("exit"), Ok(ShellCommand::Quit));
    }

    #[tokio::test]
    async fn test_shell_session() {
        let storage = MemoryStorage::new();
        let mut session = FamilySession::with_storage(storage.clone(), true).await;
        let input = Cursor::new("add child:3 male Gus\nrename 3 Charles\ndelete 2\ndelete 2\ntree\nquit\ntree\n");
        let mut output = Vec::new();

        run_shell(&mut session, input, &mut output).await.unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("[ADDED] [7] Gus (male) · child of Charlie"));
        assert!(output.contains("[UPDATED] member 3"));
        assert!(output.contains("[DELETED] member 2"));
        assert!(output.contains("[ERROR] No member 2"));
        assert!(output.contains("Alice (mother) [1] ♀\n├── Charles [3] ♂\n│   └── Gus [7] ♂\n"));
        assert!(output.trim_end().ends_with("Goodbye!"));

        let saved = storage.contents().await.unwrap();
        assert!(saved.contains("Charles"));
        assert!(!saved.contains("Bob (father)"));
    }

    #[tokio::test]
    async fn test_shell_reports_blank_name() {
        let mut session = FamilySession::with_storage(MemoryStorage::new(), true).await;
        let mut output = Vec::new();

        run_shell(&mut session, Cursor::new("rename 1\n"), &mut output)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("[ERROR] member name must not be empty"));
    }
}
