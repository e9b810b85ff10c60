use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use tagdeck::engine::App;
use tagdeck::model::{SortDirection, SortKey};
use tagdeck::registry::RegistryClient;
use tagdeck::script::{self, Platform};
use tagdeck::store::LocalStore;

#[derive(Parser)]
#[command(name = "tagdeck")]
#[command(about = "Catalog manager for a tagged container-image repository", long_about = None)]
struct Cli {
    /// Directory holding the .tagdeck data dir (defaults to the current directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data dir (.tagdeck)
    Init {
        /// Re-initialize if .tagdeck already exists
        #[arg(long)]
        force: bool,
    },

    /// Fetch the remote tag listing and merge it into the catalog
    Sync {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the filtered, sorted catalog
    List {
        /// Restrict to one tab (category)
        #[arg(long, default_value = "all")]
        tab: String,
        /// Case-insensitive substring over name, id, and category
        #[arg(long, default_value = "")]
        search: String,
        /// Sort key: name|time|category|size|date
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc|desc
        #[arg(long)]
        direction: Option<String>,
        /// Only entries marked installed
        #[arg(long)]
        installed_only: bool,
        /// Admin password; hidden tabs stay visible when it matches
        #[arg(long)]
        admin_password: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// List tabs
    Tabs {
        /// Admin password; hidden tabs stay visible when it matches
        #[arg(long)]
        admin_password: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Move entries to a category
    Move {
        /// Target category (tab id)
        #[arg(long)]
        to: String,
        /// Entry ids to move
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Mark entries as installed
    Install {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Clear the installed mark from entries
    Uninstall {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Hide a tab from non-admin views (admin only)
    Hide {
        tab: String,
        #[arg(long)]
        password: String,
    },

    /// Restore a hidden tab (admin only)
    Unhide {
        tab: String,
        #[arg(long)]
        password: String,
    },

    /// Emit a pull/run automation script for the given entries
    Export {
        /// Target platform: posix|windows
        #[arg(long, default_value = "posix")]
        platform: String,
        /// Write the script here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Entry ids, in the order the script should process them
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Export user state (settings, installed, hidden tabs, overrides)
    ExportState {
        /// Write the snapshot here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported state snapshot
    ImportState { file: PathBuf },

    /// Sync on a fixed interval until interrupted
    Watch {
        /// Seconds between sync cycles (defaults to the settings value)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current settings
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Change settings (only the provided values)
    Set {
        #[arg(long)]
        docker_user: Option<String>,
        #[arg(long)]
        repo_name: Option<String>,
        #[arg(long)]
        mount_path: Option<String>,
        /// Default sort key: name|time|category|size|date
        #[arg(long)]
        sort: Option<String>,
        /// Default sort direction: asc|desc
        #[arg(long)]
        direction: Option<String>,
        /// Registry base URL; repeat to configure alternate routes
        #[arg(long = "route")]
        routes: Vec<String>,
        #[arg(long)]
        admin_config_url: Option<String>,
        #[arg(long)]
        sync_interval_secs: Option<u64>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("get current dir")?,
    };

    match cli.command {
        Commands::Init { force } => {
            LocalStore::init(&root, force)?;
            println!("Initialized tagdeck data dir at {}", root.display());
        }

        Commands::Sync { json } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            let registry = RegistryClient::new(app.settings.registry_routes.clone())?;
            let report = app.sync(&store, &registry).await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize sync report")?
                );
            } else if !report.synced {
                println!("Registry unavailable; catalog unchanged");
            } else {
                println!(
                    "Synced {} entries ({} new, {} updated)",
                    app.catalog.len(),
                    report.newly_added.len(),
                    report.changed_metadata
                );
                for id in &report.newly_added {
                    println!("  new: {}", id);
                }
            }
        }

        Commands::List {
            tab,
            search,
            sort,
            direction,
            installed_only,
            admin_password,
            json,
        } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            app.filter.active_tab = tab;
            app.filter.search_query = search;
            if let Some(sort) = sort {
                app.filter.sort_key = sort.parse::<SortKey>()?;
            }
            if let Some(direction) = direction {
                app.filter.sort_direction = direction.parse::<SortDirection>()?;
            }
            app.filter.installed_only = installed_only;
            if let Some(password) = admin_password
                && !app.authenticate(&password)
            {
                eprintln!("admin password rejected; showing the non-admin view");
            }

            let projection = app.project();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&projection.entries)
                        .context("serialize entries")?
                );
            } else {
                for entry in &projection.entries {
                    println!(
                        "{:<28} {:<32} {:<12} {:>8} {:>7} {}",
                        entry.id,
                        entry.display_name,
                        entry.category.as_deref().unwrap_or("N/A"),
                        entry
                            .size_gb
                            .map(|s| format!("{s:.2}G"))
                            .unwrap_or_else(|| "N/A".to_string()),
                        entry
                            .estimated_hours
                            .map(|h| format!("{h}h"))
                            .unwrap_or_else(|| "N/A".to_string()),
                        entry.date_added.as_deref().unwrap_or("N/A"),
                    );
                }
                println!("{} shown of {} total", projection.visible, projection.total);
            }
        }

        Commands::Tabs {
            admin_password,
            json,
        } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            if let Some(password) = admin_password
                && !app.authenticate(&password)
            {
                eprintln!("admin password rejected; showing the non-admin view");
            }
            let tabs = app.visible_tabs();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&tabs).context("serialize tabs")?
                );
            } else {
                for tab in tabs {
                    if app.hidden_tabs.contains(&tab.id) {
                        println!("{} ({}) [hidden]", tab.id, tab.name);
                    } else {
                        println!("{} ({})", tab.id, tab.name);
                    }
                }
            }
        }

        Commands::Move { to, ids } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            for id in &ids {
                app.toggle_selection(id, true);
            }
            let changed = app.move_selected_to_category(&store, &to)?;
            if changed == 0 {
                println!("No entries needed moving; everything was already in {}", to);
            } else {
                println!("Moved {} entries to {}", changed, to);
            }
        }

        Commands::Install { ids } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            let mut changed = 0;
            for id in &ids {
                if app.set_installed(&store, id, true)? {
                    changed += 1;
                }
            }
            println!("Marked {} entries installed", changed);
        }

        Commands::Uninstall { ids } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            let mut changed = 0;
            for id in &ids {
                if app.set_installed(&store, id, false)? {
                    changed += 1;
                }
            }
            println!("Cleared the installed mark from {} entries", changed);
        }

        Commands::Hide { tab, password } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            if !app.authenticate(&password) {
                bail!("admin password rejected");
            }
            app.hide_tab(&store, &tab)?;
            println!("Hidden {}", tab);
        }

        Commands::Unhide { tab, password } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            if !app.authenticate(&password) {
                bail!("admin password rejected");
            }
            app.unhide_tab(&store, &tab)?;
            println!("Restored {}", tab);
        }

        Commands::Export {
            platform,
            output,
            ids,
        } => {
            let store = LocalStore::open(&root)?;
            let app = App::load(&store);
            let platform = platform.parse::<Platform>()?;
            let text = script::emit(
                platform,
                &ids,
                &app.settings.docker_user,
                &app.settings.repo_name,
                &app.settings.mount_path,
            );
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("write script {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", text),
            }
        }

        Commands::ExportState { output } => {
            let store = LocalStore::open(&root)?;
            let app = App::load(&store);
            let payload = serde_json::to_string_pretty(&app.export_state())
                .context("serialize state snapshot")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, payload)
                        .with_context(|| format!("write snapshot {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", payload),
            }
        }

        Commands::ImportState { file } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("read snapshot {}", file.display()))?;
            app.import_state(&store, &content)?;
            println!("State imported");
        }

        Commands::Watch { interval_secs } => {
            let store = LocalStore::open(&root)?;
            let mut app = App::load(&store);
            let registry = RegistryClient::new(app.settings.registry_routes.clone())?;
            let secs = interval_secs
                .unwrap_or(app.settings.sync_interval_secs)
                .max(1);
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(secs));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = app.sync(&store, &registry).await?;
                        if report.skipped {
                            continue;
                        }
                        if !report.synced {
                            println!("registry unavailable; will retry in {}s", secs);
                        } else if !report.newly_added.is_empty() || report.changed_metadata > 0 {
                            println!(
                                "synced: {} new, {} updated",
                                report.newly_added.len(),
                                report.changed_metadata
                            );
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("stopping");
                        break;
                    }
                }
            }
        }

        Commands::Config { command } => {
            let store = LocalStore::open(&root)?;
            match command {
                ConfigCommands::Show { json } => {
                    let settings = store.read_settings();
                    if json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&settings)
                                .context("serialize settings")?
                        );
                    } else {
                        println!("docker_user: {}", settings.docker_user);
                        println!("repo_name: {}", settings.repo_name);
                        println!("mount_path: {}", settings.mount_path);
                        println!("routes: {}", settings.registry_routes.join(", "));
                        println!(
                            "admin_config_url: {}",
                            settings.admin_config_url.as_deref().unwrap_or("(none)")
                        );
                        println!("sync_interval_secs: {}", settings.sync_interval_secs);
                    }
                }
                ConfigCommands::Set {
                    docker_user,
                    repo_name,
                    mount_path,
                    sort,
                    direction,
                    routes,
                    admin_config_url,
                    sync_interval_secs,
                } => {
                    let mut settings = store.read_settings();
                    if let Some(value) = docker_user {
                        settings.docker_user = value;
                    }
                    if let Some(value) = repo_name {
                        settings.repo_name = value;
                    }
                    if let Some(value) = mount_path {
                        settings.mount_path = value;
                    }
                    if let Some(value) = sort {
                        settings.sort_key = value.parse::<SortKey>()?;
                    }
                    if let Some(value) = direction {
                        settings.sort_direction = value.parse::<SortDirection>()?;
                    }
                    if !routes.is_empty() {
                        settings.registry_routes = routes;
                    }
                    if let Some(value) = admin_config_url {
                        settings.admin_config_url = Some(value);
                    }
                    if let Some(value) = sync_interval_secs {
                        settings.sync_interval_secs = value.max(1);
                    }
                    store.write_settings(&settings)?;
                    println!("Settings updated");
                }
            }
        }
    }

    Ok(())
}
