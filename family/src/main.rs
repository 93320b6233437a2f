//! Family tree command-line front end.
//!
//! # Usage
//!
//! ```bash
//! # Draw the tree (the default command)
//! family show
//!
//! # Add people
//! family add --name "Carl" --gender male --child-of 1
//! family add --name "Dora" --gender female --spouse-of 3 --dob 1961-04-02
//!
//! # Edit and remove
//! family update 3 --name "Charles" --clear dob
//! family delete 2
//!
//! # Interactive editing
//! family shell
//!
//! # Use another file (also read from FAMILY_TREE_PATH or a .env file)
//! family --data ~/trees/smiths.json list --search ali
//!
//! # Debug logging
//! RUST_LOG=debug family show
//! ```

mod render;
mod shell;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use family_core::{
    Attachment, FamilySession, Gender, MemberId, MemberPatch, NewMember, SessionConfig,
};
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use render::{describe_member, render_forest, render_list};

#[derive(Debug, Parser)]
#[command(name = "family", version, about = "Browse and edit a family tree")]
struct Cli {
    /// JSON file the tree is kept in
    #[arg(long, global = true, env = SessionConfig::DATA_PATH_ENV, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Start from an empty tree instead of the sample family when no file exists
    #[arg(long, global = true)]
    empty: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw the family tree
    Show {
        /// Print the materialized forest as JSON
        #[arg(long)]
        json: bool,
    },
    /// List members
    List {
        /// Only members whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a member
    Add(AddArgs),
    /// Edit a member's details
    Update(UpdateArgs),
    /// Delete a member and unlink them from everyone else
    Delete {
        id: MemberId,
    },
    /// Edit interactively
    Shell,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    name: String,

    #[arg(long, default_value = "other")]
    gender: Gender,

    /// Marry the new member to this member
    #[arg(long, value_name = "ID", conflicts_with = "child_of")]
    spouse_of: Option<MemberId>,

    /// Add the new member as a child of this member (and their spouse)
    #[arg(long, value_name = "ID")]
    child_of: Option<MemberId>,

    #[command(flatten)]
    details: DetailArgs,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    id: MemberId,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    gender: Option<Gender>,

    #[command(flatten)]
    details: DetailArgs,

    /// Clear an optional field
    #[arg(long, value_enum, value_name = "FIELD")]
    clear: Vec<ClearField>,
}

#[derive(Debug, Args)]
struct DetailArgs {
    #[arg(long)]
    description: Option<String>,

    /// Date of birth
    #[arg(long)]
    dob: Option<String>,

    /// Date of death
    #[arg(long)]
    dod: Option<String>,

    #[arg(long, value_name = "URL")]
    image_url: Option<String>,

    #[arg(long, value_name = "URL")]
    social_media: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ClearField {
    Description,
    Dob,
    Dod,
    ImageUrl,
    SocialMedia,
}

impl AddArgs {
    fn attachment(&self) -> Attachment {
        match (self.spouse_of, self.child_of) {
            (Some(target), _) => Attachment::Spouse(target),
            (None, Some(target)) => Attachment::Child(target),
            (None, None) => Attachment::Root,
        }
    }

    fn into_new_member(self) -> NewMember {
        let d = self.details;
        NewMember {
            name: self.name,
            gender: self.gender,
            image_url: d.image_url,
            social_media: d.social_media,
            description: d.description.unwrap_or_default(),
            dob: d.dob,
            dod: d.dod,
        }
    }
}

impl UpdateArgs {
    fn into_patch(self) -> MemberPatch {
        let d = self.details;
        let mut patch = MemberPatch {
            name: self.name,
            gender: self.gender,
            image_url: d.image_url.map(Some),
            social_media: d.social_media.map(Some),
            description: d.description,
            dob: d.dob.map(Some),
            dod: d.dod.map(Some),
        };
        for field in self.clear {
            match field {
                ClearField::Description => patch.description = Some(String::new()),
                ClearField::Dob => patch.dob = Some(None),
                ClearField::Dod => patch.dod = Some(None),
                ClearField::ImageUrl => patch.image_url = Some(None),
                ClearField::SocialMedia => patch.social_media = Some(None),
            }
        }
        patch
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn report_save(session: &FamilySession) {
    if let Some(e) = session.last_save_error() {
        eprintln!("Warning: changes were not saved to {}: {e}", session.location());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present, before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SessionConfig::from_env().with_sample_fallback(!cli.empty);
    if let Some(path) = cli.data {
        config = config.with_data_path(path);
    }
    debug!(path = %config.data_path.display(), "Opening family tree");

    let mut session = FamilySession::open(config).await;

    match cli.command.unwrap_or(Command::Show { json: false }) {
        Command::Show { json: false } => print!("{}", render_forest(&session.forest())),
        Command::Show { json: true } => {
            let json = serde_json::to_string_pretty(&session.forest())
                .context("Failed to serialize the family tree")?;
            println!("{json}");
        }
        Command::List { search } => {
            let store = session.store();
            let listing = match search {
                Some(query) => render_list(store, store.find_by_name(&query)),
                None => render_list(store, store.all()),
            };
            print!("{listing}");
        }
        Command::Add(args) => {
            let attachment = args.attachment();
            if let Some(target) = attachment.target() {
                if !session.store().contains(target) {
                    eprintln!("Warning: no member {target}; adding without a link");
                }
            }
            let id = session.add_member(args.into_new_member(), attachment).await?;
            report_save(&session);
            if let Some(member) = session.store().get(id) {
                println!("Added {}", describe_member(session.store(), member));
            }
        }
        Command::Update(args) => {
            let id = args.id;
            let patch = args.into_patch();
            if patch.is_empty() {
                bail!("Nothing to update; pass at least one field");
            }
            if session.update_member(id, patch).await? {
                report_save(&session);
                if let Some(member) = session.store().get(id) {
                    println!("Updated {}", describe_member(session.store(), member));
                }
            } else {
                println!("No member with id {id}");
            }
        }
        Command::Delete { id } => {
            if session.delete_member(id).await {
                report_save(&session);
                println!("Deleted member {id}");
            } else {
                println!("No member with id {id}");
            }
        }
        Command::Shell => {
            let stdin = io::stdin();
            shell::run_shell(&mut session, stdin.lock(), io::stdout()).await?;
        }
    }

    Ok(())
}
