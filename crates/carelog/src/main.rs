//! `carelog` - CLI for structured daily care records
//!
//! This binary records observations about residents, shows today's counts,
//! and moves records in and out of browser storage dumps.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use serde_json::Value;
use tracing::warn;

use carelog::cli::{
    CategoriesCommand, Cli, Command, ConfigCommand, CountsCommand, ExportCommand, ImportCommand,
    LogCommand, OutputFormat, RecordCommand, ResidentsCommand, StatusCommand,
};
use carelog::recorder::AUTO_SAVE_WARNING;
use carelog::{
    init_logging, legacy, Category, CategoryCounts, CategoryDef, Config, EventPayload,
    MemoryStore, Recorder, RecorderIdentity, Resident, ResidentId, SqliteDirectory, Storage,
    SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Export(cmd) => handle_export(&config, &cmd),
        Command::Import(cmd) => handle_import(&config, &cmd),
        Command::Residents(cmd) => handle_residents(&config, cmd).await,
        Command::Categories(cmd) => handle_categories(&config, cmd).await,
        Command::Record(cmd) => handle_record(&config, cmd).await,
        Command::Counts(cmd) => handle_counts(&config, &cmd).await,
        Command::Log(cmd) => handle_log(&config, &cmd).await,
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Arc<Storage>> {
    let path = config.database_path();
    let storage =
        Storage::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Arc::new(storage))
}

async fn open_recorder(config: &Config, storage: Arc<Storage>) -> anyhow::Result<Recorder> {
    let directory = Arc::new(SqliteDirectory::new(Arc::clone(&storage)));
    let recorder = Recorder::new(
        storage,
        directory,
        config.session_context(),
        Arc::new(SystemClock),
        RecorderIdentity::from(&config.recorder),
    )
    .await?;

    if recorder.show_admin_warning() {
        eprintln!("⚠️  {AUTO_SAVE_WARNING}");
    }
    Ok(recorder)
}

/// Build the payload from `--data` and `--notes`.
fn build_payload(
    category: Category,
    data: &str,
    notes: Option<&str>,
) -> anyhow::Result<EventPayload> {
    let mut value: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
    let Some(object) = value.as_object_mut() else {
        bail!("--data must be a JSON object");
    };
    if let Some(notes) = notes {
        object.insert("notes".to_string(), Value::String(notes.to_string()));
    }
    Ok(EventPayload::from_data(category, value)?)
}

async fn handle_record(config: &Config, cmd: RecordCommand) -> anyhow::Result<()> {
    let category: Category = cmd.category.parse()?;
    let payload = build_payload(category, &cmd.data, cmd.notes.as_deref())?;

    let mut recorder = open_recorder(config, open_storage(config)?).await?;
    if recorder.select_resident(cmd.resident.as_str()).is_none() {
        warn!("Resident {} is not in the directory", cmd.resident);
    }
    if !recorder.select_category(category.id()) {
        bail!("category '{}' is not offered", category);
    }

    let record = match recorder.submit(payload).await {
        Ok(Some(record)) => record,
        Ok(None) => bail!("nothing was recorded"),
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(anyhow!(e));
        }
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Plain | OutputFormat::Table => {
            if let Some(toast) = recorder.toast() {
                println!("{toast}");
            }
            println!(
                "{} {} / {} / {}",
                record.category().icon(),
                recorder.catalog().name_of(record.category()),
                record.user_id,
                record.id
            );
            println!("今日の記録: {}件", recorder.counts().total());
        }
    }
    Ok(())
}

async fn handle_counts(config: &Config, cmd: &CountsCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let mut recorder = open_recorder(config, Arc::clone(&storage)).await?;

    if cmd.all_time {
        let resident = cmd.resident.as_deref().map(ResidentId::from);
        let records = storage.all_events()?;
        let counts = CategoryCounts::from_records(&records, resident.as_ref());
        let rows: Vec<(Category, u32)> = recorder
            .catalog()
            .categories()
            .into_iter()
            .map(|c| (c, counts.get(c)))
            .collect();
        return print_counts(&recorder, &rows, None, cmd.format);
    }

    if let Some(date) = cmd.date {
        recorder.refresh(date).await?;
    }
    let counts = recorder.counts().clone();
    let rows: Vec<(Category, u32)> = counts.iter().collect();
    print_counts(&recorder, &rows, Some(counts.date()), cmd.format)
}

fn print_counts(
    recorder: &Recorder,
    rows: &[(Category, u32)],
    date: Option<chrono::NaiveDate>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let total: u32 = rows.iter().map(|(_, n)| n).sum();
    match format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, Value> = rows
                .iter()
                .map(|(c, n)| (c.id().to_string(), Value::from(*n)))
                .collect();
            let out = serde_json::json!({
                "date": date.map(|d| d.to_string()),
                "counts": counts,
                "total": total,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Plain => {
            for (category, n) in rows {
                println!("{category}\t{n}");
            }
        }
        OutputFormat::Table => {
            match date {
                Some(date) => println!("{date}"),
                None => println!("全期間"),
            }
            println!("------------------------------");
            for (category, n) in rows {
                println!(
                    "{} {:<12} {:>4}件",
                    category.icon(),
                    recorder.catalog().name_of(*category),
                    n
                );
            }
            println!("------------------------------");
            println!("今日の記録: {total}件");
        }
    }
    Ok(())
}

async fn handle_log(config: &Config, cmd: &LogCommand) -> anyhow::Result<()> {
    let recorder = open_recorder(config, open_storage(config)?).await?;
    if !recorder.session().admin_features() {
        bail!("the log viewer is only available in admin mode");
    }

    if let Some(resident) = cmd.resident.as_deref() {
        return print_resident_log(recorder, resident);
    }

    let view = recorder.facility_log_view();
    if cmd.saved_at {
        println!("{}", view.last_saved);
    } else {
        println!("最終保存: {}", view.last_saved);
        println!("{}", view.logs_json);
    }
    Ok(())
}

fn print_resident_log(mut recorder: Recorder, resident: &str) -> anyhow::Result<()> {
    if recorder.select_resident(resident).is_none() {
        bail!("unknown resident: {resident}");
    }
    let Some(view) = recorder.resident_log_view()? else {
        bail!("no resident selected");
    };

    println!("{}さんの記録（{}）", view.resident_name, view.date);
    println!("最終保存日時: {}", view.last_saved);
    println!();
    for (category, n) in &view.counts {
        println!(
            "{} {:<12} {:>4}件",
            category.icon(),
            recorder.catalog().name_of(*category),
            n
        );
    }
    println!();
    println!("日付\tイベント\t記録内容\t記録者");
    for row in &view.rows {
        println!(
            "{}\t{}\t{}\t{}",
            row.date, row.category, row.content, row.author
        );
    }
    Ok(())
}

async fn handle_residents(config: &Config, cmd: ResidentsCommand) -> anyhow::Result<()> {
    match cmd {
        ResidentsCommand::List { json } => {
            let recorder = open_recorder(config, open_storage(config)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(recorder.residents())?);
            } else if recorder.residents().is_empty() {
                println!("No residents. Add one with `carelog residents add <id> <name>`.");
            } else {
                for resident in recorder.residents() {
                    println!(
                        "[{}] {}\t{}",
                        resident.initial().unwrap_or('?'),
                        resident.id,
                        resident.name
                    );
                }
            }
        }
        ResidentsCommand::Add { id, name } => {
            let directory = SqliteDirectory::new(open_storage(config)?);
            directory.add_resident(&Resident::new(id.as_str(), name.as_str()))?;
            println!("Added {id} ({name})");
        }
        ResidentsCommand::Rename { id, name } => {
            let mut recorder = open_recorder(config, open_storage(config)?).await?;
            if recorder.select_resident(id.as_str()).is_none() {
                bail!("unknown resident: {id}");
            }
            if !recorder.rename_resident(&name).await? {
                bail!("renaming residents requires admin mode and a non-blank name");
            }
            println!("Renamed {id} to {}", name.trim());
        }
    }
    Ok(())
}

async fn handle_categories(config: &Config, cmd: CategoriesCommand) -> anyhow::Result<()> {
    let mut recorder = open_recorder(config, open_storage(config)?).await?;
    let entries = match cmd {
        CategoriesCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(recorder.catalog().entries())?);
            } else {
                for entry in recorder.catalog().entries() {
                    println!("{} {}\t{}\t{}", entry.icon, entry.id, entry.name, entry.color);
                }
            }
            return Ok(());
        }
        CategoriesCommand::Set { ids } => ids.into_iter().map(CategoryDef::from).collect(),
        CategoriesCommand::Reset => Category::ALL.into_iter().map(CategoryDef::from).collect(),
    };

    if !recorder.update_catalog(entries)? {
        bail!("editing categories requires admin mode");
    }
    let names: Vec<&str> = recorder
        .catalog()
        .entries()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    println!("Categories: {}", names.join(", "));
    Ok(())
}

fn handle_export(config: &Config, cmd: &ExportCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let dump = MemoryStore::new();
    let report = legacy::export(&storage, &dump)?;
    dump.write_json_file(&cmd.output)
        .with_context(|| format!("failed to write {}", cmd.output.display()))?;
    println!(
        "Exported {} records in {} buckets to {}",
        report.records,
        report.buckets,
        cmd.output.display()
    );
    Ok(())
}

fn handle_import(config: &Config, cmd: &ImportCommand) -> anyhow::Result<()> {
    let dump = MemoryStore::from_json_file(&cmd.input)
        .with_context(|| format!("failed to read {}", cmd.input.display()))?;
    let storage = open_storage(config)?;
    let report = legacy::import(&dump, &storage)?;
    println!(
        "Imported {} records from {} buckets ({} duplicates, {} skipped)",
        report.imported, report.buckets, report.duplicates, report.skipped
    );
    if report.categories {
        println!("Category list imported.");
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;
    let session = config.session_context();

    if cmd.json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "total_events": stats.total_events,
            "residents": stats.residents,
            "daily_logs": stats.daily_logs,
            "oldest_event": stats.oldest_event,
            "newest_event": stats.newest_event,
            "last_saved_at": stats.last_saved_at,
            "db_size_bytes": stats.db_size_bytes,
            "session": session,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("carelog status");
        println!("--------------");
        if !config.recorder.facility_name.is_empty() {
            println!("Facility:      {}", config.recorder.facility_name);
        }
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Records:       {}", stats.total_events);
        println!("Residents:     {}", stats.residents);
        println!("Daily logs:    {}", stats.daily_logs);
        if let (Some(oldest), Some(newest)) = (stats.oldest_event, stats.newest_event) {
            println!("Range:         {oldest} .. {newest}");
        }
        match stats.last_saved_at {
            Some(at) => println!("Last saved:    {at}"),
            None => println!("Last saved:    未保存"),
        }
        if session.admin_mode {
            println!(
                "管理者モード:  {}",
                if session.authenticated { "認証済み" } else { "未認証" }
            );
        }
        println!(
            "自動保存:      {}",
            if session.auto_save_enabled { "有効" } else { "無効" }
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!("  Admin mode:         {}", config.session.admin_mode);
                println!("  Authenticated:      {}", config.session.authenticated);
                println!("  Auto save:          {}", config.session.auto_save_enabled);
                println!();
                println!("[Recorder]");
                println!("  Staff id:           {}", config.recorder.staff_id);
                println!("  Recorder name:      {}", config.recorder.recorder_name);
                println!("  Facility name:      {}", config.recorder.facility_name);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
