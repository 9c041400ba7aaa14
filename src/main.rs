use anyhow::Result;
use clap::{Parser, Subcommand};
use gitclone::areas::repository::Repository;
use gitclone::commands::porcelain::log::LogOptions;
use gitclone::commands::porcelain::reset::ResetMode;
use gitclone::config::{Config, DEFAULT_LOG_FILTER, LOG_FILTER_VAR};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gitclone",
    version = "0.1.0",
    about = "A local, single-repository version-control engine",
    long_about = "This is a small version-control engine modelled on git. \
    It keeps content-addressed objects, a staging index and a linear commit history \
    in a .git directory next to the working tree.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "add",
        about = "Add file contents to the index",
        long_about = "This command stages files or whole directories. \
        Tracked files that no longer exist are removed from the index."
    )]
    Add {
        #[arg(index = 1, required = true, help = "The files to stage")]
        files: Vec<PathBuf>,
    },
    #[command(
        name = "rm",
        about = "Remove files from the index",
        long_about = "This command unstages files. The working tree is never touched."
    )]
    Rm {
        #[arg(long, help = "Only remove the files from the index")]
        cached: bool,
        #[arg(index = 1, required = true, help = "The files to unstage")]
        files: Vec<PathBuf>,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit in the repository with the specified commit message."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(
        name = "status",
        about = "Show the working tree status",
        long_about = "This command compares HEAD, the index and the working tree."
    )]
    Status {
        #[arg(long, help = "Give the output in a stable, easy-to-parse format")]
        porcelain: bool,
    },
    #[command(
        name = "log",
        about = "Show commit logs",
        long_about = "This command walks the history from HEAD back to the root commit."
    )]
    Log {
        #[arg(short = 'n', long, help = "Limit the number of commits to show")]
        limit: Option<usize>,
        #[arg(long, help = "Show each commit on a single line")]
        oneline: bool,
    },
    #[command(
        name = "reset",
        about = "Reset HEAD to the specified commit",
        long_about = "This command moves HEAD. A mixed reset (the default) also rewrites the index; \
        a hard reset rewrites the index and the working tree, discarding uncommitted changes."
    )]
    Reset {
        #[arg(index = 1, help = "The commit to reset to")]
        revision: String,
        #[arg(long, help = "Only move HEAD")]
        soft: bool,
        #[arg(long, help = "Also overwrite the working tree")]
        hard: bool,
    },
    #[command(
        name = "stash",
        about = "Stash the changes in a dirty working directory away",
        long_about = "This command records local changes on a stack and resets the working tree to HEAD."
    )]
    Stash {
        #[command(subcommand)]
        command: StashCommands,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes an object file and can write it to the object database. \
        It requires the path to the file to be specified."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        It requires the id (or a unique prefix of it) of the object to be specified."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object id to print")]
        sha: String,
    },
}

#[derive(Subcommand)]
enum StashCommands {
    #[command(name = "save", about = "Save local changes and reset to HEAD")]
    Save {
        #[arg(short, long, help = "The stash message")]
        message: Option<String>,
    },
    #[command(name = "apply", about = "Apply a stash entry without removing it")]
    Apply {
        #[arg(index = 1, default_value_t = 0, help = "The stash position")]
        index: usize,
    },
    #[command(name = "list", about = "List stash entries, most recent first")]
    List,
    #[command(name = "drop", about = "Remove a stash entry")]
    Drop {
        #[arg(index = 1, default_value_t = 0, help = "The stash position")]
        index: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let pwd = std::env::current_dir()?;
    let config = Config::from_env();

    if let Commands::Init { path } = &cli.command {
        let path = path.as_deref().map_or_else(|| pwd.clone(), |path| absolute(&pwd, path));
        let repository = Repository::init(&path, config).await?;
        println!(
            "Initialized empty repository in {}",
            repository.git_path().display()
        );
        return Ok(());
    }

    let repository = Repository::discover(&pwd, config)?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Add { files } => {
            let files = absolute_all(&pwd, &files);
            repository.add(&files).await?;
        }
        Commands::Rm { cached, files } => {
            if !cached {
                anyhow::bail!("rm only supports --cached; the working tree is never touched");
            }
            let files = absolute_all(&pwd, &files);
            repository.remove(&files).await?;
        }
        Commands::Commit { message } => {
            let receipt = repository.commit(&message).await?;
            println!("{receipt}");
        }
        Commands::Status { porcelain } => {
            let status = repository.status().await?;
            if porcelain {
                print!("{}", status.porcelain());
            } else {
                print!("{}", status.long_format());
            }
        }
        Commands::Log { limit, oneline } => {
            let opts = LogOptions { oneline, limit };
            for entry in repository.log(opts.limit)? {
                let (oid, commit) = entry?;
                println!("{}", Repository::display_commit(&oid, &commit, &opts));
            }
        }
        Commands::Reset {
            revision,
            soft,
            hard,
        } => {
            let mode = ResetMode::from_flags(soft, hard)?;
            let oid = repository.reset(&revision, mode).await?;
            if mode == ResetMode::Hard {
                let commit = repository.load_commit(&oid)?;
                println!(
                    "HEAD is now at {} {}",
                    oid.to_short_oid(),
                    commit.short_message()
                );
            }
        }
        Commands::Stash { command } => run_stash(&repository, command).await?,
        Commands::HashObject { write, file } => {
            let oid = repository.hash_object(&absolute(&pwd, &file), write)?;
            println!("{oid}");
        }
        Commands::CatFile { sha } => {
            print!("{}", repository.cat_file(&sha)?);
        }
    }

    Ok(())
}

async fn run_stash(repository: &Repository, command: StashCommands) -> Result<()> {
    match command {
        StashCommands::Save { message } => {
            let (entry, _) = repository.stash_save(message.as_deref()).await?;
            println!(
                "Saved working directory and index state {}",
                entry.message.unwrap_or_default()
            );
        }
        StashCommands::Apply { index } => {
            repository.stash_apply(index).await?;
        }
        StashCommands::List => {
            for (index, (entry, commit)) in repository.stash_list()?.into_iter().enumerate() {
                let subject = entry.message.unwrap_or_else(|| commit.short_message());
                println!("stash@{{{index}}}: {subject}");
            }
        }
        StashCommands::Drop { index } => {
            let entry = repository.stash_drop(index).await?;
            println!("Dropped stash@{{{index}}} ({})", entry.commit);
        }
    }

    Ok(())
}

fn absolute(pwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        pwd.join(path)
    }
}

fn absolute_all(pwd: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().map(|path| absolute(pwd, path)).collect()
}
