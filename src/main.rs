use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use quizround::app_dirs::AppDirs;
use quizround::bank::{QuestionBank, QuestionPack};
use quizround::config::{Config, ConfigStore, FileConfigStore};
use quizround::play::{run_round, RoundExit};
use quizround::review::{analyze_weaknesses, history_key, select_review};
use quizround::round::{RoundEngine, RoundResult};
use quizround::round_source::{RoundMode, RoundSource};
use quizround::runtime::{FixedTicker, Runner, StdinEventSource};
use quizround::scoring::QUESTIONS_PER_ROUND;
use quizround::session::RoundOptions;
use quizround::shuffle::{daily_seed, select_daily};
use quizround::stats::{Profile, RoundSaved};
use quizround::timer::IntervalScheduler;

const POLL_INTERVAL_MS: u64 = 250;

/// timed multiple-choice quiz rounds in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed multiple-choice quiz rounds with speed and streak scoring, a daily challenge shared by every player, and a review mode that brings back the questions you missed."
)]
pub struct Cli {
    /// question pack (JSON) merged over the bundled bank
    #[clap(long, global = true)]
    bank: Option<PathBuf>,

    /// profile file to read and update
    #[clap(long, global = true)]
    profile: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// play a round (today's daily challenge unless a mode is given)
    Play(PlayArgs),
    /// show the daily challenge set for a date
    Daily {
        /// date as YYYY-MM-DD, defaults to today
        #[clap(long)]
        date: Option<NaiveDate>,
    },
    /// show what a review round would ask, with weights
    Review {
        #[clap(short = 'n', long)]
        count: Option<usize>,
    },
    /// level, streak, per-category stats and weak spots
    Stats,
    /// list the categories in the bank
    Categories,
    /// show or change saved defaults
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
#[clap(group(ArgGroup::new("mode").args(["category", "daily", "review"])))]
struct PlayArgs {
    /// play questions from one category
    #[clap(short, long)]
    category: Option<String>,

    /// play today's daily challenge
    #[clap(long)]
    daily: bool,

    /// play a review round built from your history
    #[clap(long)]
    review: bool,

    /// no countdown; every answer earns the full speed bonus
    #[clap(long)]
    no_timer: bool,

    /// number of questions, at most 10
    #[clap(short = 'n', long)]
    count: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[clap(long)]
    no_timer: Option<bool>,

    #[clap(long)]
    daily_count: Option<usize>,

    #[clap(long)]
    review_count: Option<usize>,
}

struct AppContext {
    bank: QuestionBank,
    config: Config,
    profile_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizround=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FileConfigStore::new();
    let config = store.load();
    debug!(path = %store.path().display(), ?config, "config loaded");

    if let Command::Config(args) = &cli.command {
        return update_config(&store, config, args);
    }

    let ctx = AppContext {
        bank: load_bank(cli.bank.as_deref().or(config.bank_path.as_deref()))?,
        profile_path: cli
            .profile
            .clone()
            .or_else(|| config.profile_path.clone())
            .or_else(AppDirs::profile_path)
            .unwrap_or_else(|| PathBuf::from("quizround_profile.json")),
        config,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Play(args) => play(&ctx, &args, &mut out),
        Command::Daily { date } => show_daily(&ctx, date.unwrap_or_else(today), &mut out),
        Command::Review { count } => show_review(&ctx, count, &mut out),
        Command::Stats => show_stats(&ctx, &mut out),
        Command::Categories => show_categories(&ctx, &mut out),
        Command::Config(_) => Ok(()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn load_bank(pack_path: Option<&Path>) -> Result<QuestionBank> {
    let mut bank = QuestionBank::bundled().context("failed to load the bundled question bank")?;

    if let Some(path) = pack_path {
        let pack = QuestionPack::from_path(path)
            .with_context(|| format!("failed to load question pack {}", path.display()))?;
        let added = bank.merge_pack(pack);
        debug!(path = %path.display(), added, "question pack merged");
    }

    if bank.is_empty() {
        bail!("the question bank is empty");
    }
    Ok(bank)
}

fn load_profile(path: &Path) -> Result<Profile> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("profile {} is not valid JSON", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Profile::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read profile {}", path.display())),
    }
}

fn save_profile(path: &Path, profile: &Profile) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(profile)?;
    fs::write(path, data).with_context(|| format!("failed to write profile {}", path.display()))
}

fn update_config(store: &FileConfigStore, mut config: Config, args: &ConfigArgs) -> Result<()> {
    let changed = args.no_timer.is_some() || args.daily_count.is_some() || args.review_count.is_some();
    if let Some(no_timer) = args.no_timer {
        config.no_timer = no_timer;
    }
    if let Some(count) = args.daily_count {
        config.daily_count = count;
    }
    if let Some(count) = args.review_count {
        config.review_count = count;
    }
    if changed {
        store
            .save(&config)
            .with_context(|| format!("failed to save config {}", store.path().display()))?;
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn play_mode(args: &PlayArgs, config: &Config) -> (RoundMode, usize) {
    match (&args.category, args.review) {
        (Some(id), _) => (RoundMode::Category(id.clone()), QUESTIONS_PER_ROUND),
        (None, true) => (RoundMode::Review, config.review_count),
        (None, false) => (RoundMode::Daily, config.daily_count),
    }
}

fn play<W: Write>(ctx: &AppContext, args: &PlayArgs, out: &mut W) -> Result<()> {
    let today = today();
    let mut profile = load_profile(&ctx.profile_path)?;
    let (mode, default_count) = play_mode(args, &ctx.config);
    let count = args.count.unwrap_or(default_count).min(QUESTIONS_PER_ROUND);

    if mode == RoundMode::Daily {
        if let Some(score) = profile.daily_result(today) {
            writeln!(out, "Today's challenge is done: {score} points. Come back tomorrow.")?;
            return Ok(());
        }
    }

    let mut rng = rand::thread_rng();
    let planned =
        RoundSource::new(&ctx.bank, &profile.question_history).plan(&mode, count, today, &mut rng);
    if planned.is_empty() {
        bail!("no questions available for {mode} mode");
    }

    let mut engine = RoundEngine::with_scheduler(IntervalScheduler::new());
    engine.start_round(
        planned.iter().map(|p| p.question.clone()).collect(),
        RoundOptions {
            no_timer: args.no_timer || ctx.config.no_timer,
        },
    );
    let runner = Runner::new(
        StdinEventSource::new(),
        FixedTicker::new(Duration::from_millis(POLL_INTERVAL_MS)),
    );

    let exit = run_round(&mut engine, &runner, out)?;
    profile.record_outcomes(&planned, engine.outcomes(), today);

    match exit {
        RoundExit::Completed(result) => {
            print_result(out, &result)?;
            match &mode {
                RoundMode::Daily => profile.apply_daily(result.score, today),
                RoundMode::Category(id) => {
                    let saved = profile.apply_round(id, &result, today);
                    print_saved(out, &saved, &profile)?;
                }
                RoundMode::Review => {
                    let saved = profile.apply_round("review", &result, today);
                    print_saved(out, &saved, &profile)?;
                }
            }
        }
        RoundExit::Quit => writeln!(out, "Round abandoned.")?,
    }

    save_profile(&ctx.profile_path, &profile)
}

fn print_result<W: Write>(out: &mut W, result: &RoundResult) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "Score: {}", result.score)?;
    writeln!(
        out,
        "Correct: {}/{} ({}%)",
        result.correct, result.total, result.accuracy
    )?;
    writeln!(out, "Best streak: {}", result.best_streak)?;
    writeln!(
        out,
        "Stars: {}{}",
        "*".repeat(result.stars as usize),
        "-".repeat(3 - result.stars.min(3) as usize)
    )?;
    if result.is_perfect {
        writeln!(out, "Perfect round!")?;
    }
    Ok(())
}

fn print_saved<W: Write>(out: &mut W, saved: &RoundSaved, profile: &Profile) -> Result<()> {
    if saved.is_high_score {
        writeln!(out, "New high score!")?;
    }
    if saved.level_up {
        let info = profile.level_info();
        writeln!(out, "Level up! {} -> {} ({})", saved.level_before, info.level, info.title)?;
    }
    writeln!(out, "Play streak: {} day(s)", profile.play_streak)?;
    Ok(())
}

fn show_daily<W: Write>(ctx: &AppContext, date: NaiveDate, out: &mut W) -> Result<()> {
    let pool: Vec<_> = ctx.bank.entries().collect();
    let picked = select_daily(&pool, date, ctx.config.daily_count);

    writeln!(out, "Daily challenge {date} (seed {})", daily_seed(date))?;
    for (i, entry) in picked.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {:<14} {}",
            i + 1,
            history_key(entry.category_id, entry.index),
            entry.question.prompt
        )?;
    }
    Ok(())
}

fn show_review<W: Write>(ctx: &AppContext, count: Option<usize>, out: &mut W) -> Result<()> {
    let profile = load_profile(&ctx.profile_path)?;
    let count = count.unwrap_or(ctx.config.review_count);
    let mut rng = rand::thread_rng();
    let picked = select_review(&ctx.bank, &profile.question_history, today(), count, &mut rng);

    if picked.is_empty() {
        writeln!(out, "Nothing to review.")?;
        return Ok(());
    }
    for candidate in picked {
        writeln!(
            out,
            "{:>5.2}  {:<14} {}",
            candidate.weight,
            history_key(candidate.category_id, candidate.index),
            candidate.question.prompt
        )?;
    }
    Ok(())
}

fn show_stats<W: Write>(ctx: &AppContext, out: &mut W) -> Result<()> {
    let profile = load_profile(&ctx.profile_path)?;
    let info = profile.level_info();

    writeln!(out, "Level {} {}", info.level, info.title)?;
    writeln!(
        out,
        "Lifetime score {} (next level at {}, {:.0}%)",
        info.current_score,
        info.next_level_score,
        info.progress * 100.0
    )?;
    writeln!(out, "Play streak: {} day(s)", profile.play_streak)?;
    match profile.daily_result(today()) {
        Some(score) => writeln!(out, "Today's daily challenge: {score}")?,
        None => writeln!(out, "Today's daily challenge: not played")?,
    }

    writeln!(out)?;
    writeln!(out, "Categories")?;
    for meta in ctx.bank.metas() {
        let stats = profile.category_stats(&meta.id);
        writeln!(
            out,
            "  {:<12} best {:>5}  played {:>3}  accuracy {:>3}%  stars {}",
            meta.name,
            stats.high_score,
            stats.times_played,
            stats.accuracy(),
            stats.stars()
        )?;
    }

    if profile.question_history.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "Weak spots")?;
    for weakness in analyze_weaknesses(&ctx.bank.metas(), &profile.question_history) {
        if weakness.total_answered == 0 {
            continue;
        }
        writeln!(
            out,
            "  {:<12} {:>3}% of {} answers, {} weak question(s)",
            weakness.name, weakness.accuracy, weakness.total_answered, weakness.weak_count
        )?;
    }
    Ok(())
}

fn show_categories<W: Write>(ctx: &AppContext, out: &mut W) -> Result<()> {
    for category in ctx.bank.categories() {
        let meta = &category.meta;
        writeln!(
            out,
            "{:<12} {} {:<12} {:>3} questions  {}",
            meta.id,
            meta.emoji,
            meta.name,
            category.questions.len(),
            meta.description
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_play_defaults() {
        let cli = Cli::parse_from(["quizround", "play"]);
        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.category, None);
        assert!(!args.daily);
        assert!(!args.review);
        assert!(!args.no_timer);
        assert_eq!(args.count, None);
        assert_eq!(
            play_mode(&args, &Config::default()),
            (RoundMode::Daily, 10)
        );
    }

    #[test]
    fn test_cli_play_modes() {
        let cli = Cli::parse_from(["quizround", "play", "--category", "science", "-n", "5"]);
        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.count, Some(5));
        assert_eq!(
            play_mode(&args, &Config::default()).0,
            RoundMode::Category("science".into())
        );

        let cli = Cli::parse_from(["quizround", "play", "--review", "--no-timer"]);
        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert!(args.no_timer);
        let config = Config {
            review_count: 7,
            ..Config::default()
        };
        assert_eq!(play_mode(&args, &config), (RoundMode::Review, 7));
    }

    #[test]
    fn test_cli_play_modes_conflict() {
        assert!(Cli::try_parse_from(["quizround", "play", "--daily", "--review"]).is_err());
        assert!(Cli::try_parse_from(["quizround", "play", "-c", "x", "--daily"]).is_err());
    }

    #[test]
    fn test_cli_global_paths() {
        let cli = Cli::parse_from(["quizround", "stats", "--profile", "/tmp/p.json"]);
        assert_eq!(cli.profile, Some(PathBuf::from("/tmp/p.json")));

        let cli = Cli::parse_from(["quizround", "--bank", "pack.json", "categories"]);
        assert_eq!(cli.bank, Some(PathBuf::from("pack.json")));
    }

    #[test]
    fn test_cli_daily_date() {
        let cli = Cli::parse_from(["quizround", "daily", "--date", "2024-01-15"]);
        assert!(matches!(
            cli.command,
            Command::Daily { date: Some(d) } if d == NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        ));
        assert!(Cli::try_parse_from(["quizround", "daily", "--date", "yesterday"]).is_err());
    }

    #[test]
    fn test_profile_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("profile.json");

        assert_eq!(load_profile(&path).unwrap(), Profile::default());

        let profile = Profile {
            lifetime_score: 4_200,
            play_streak: 3,
            ..Profile::default()
        };
        save_profile(&path, &profile).unwrap();
        assert_eq!(load_profile(&path).unwrap(), profile);

        fs::write(&path, b"not json").unwrap();
        assert!(load_profile(&path).is_err());
    }

    #[test]
    fn test_load_bank_with_pack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.json");
        fs::write(
            &path,
            r#"{"packName": "extra", "categories": [{"meta": {"id": "art", "name": "Art"},
                "questions": [{"q": "Who painted the Mona Lisa?", "choices": ["Leonardo", "Monet"], "answer": 0}]}]}"#,
        )
        .unwrap();

        let bundled = QuestionBank::bundled().unwrap();
        let bank = load_bank(Some(&path)).unwrap();
        assert_eq!(bank.len(), bundled.len() + 1);
        assert!(bank.category("art").is_some());
        assert!(load_bank(Some(&dir.path().join("missing.json"))).is_err());
    }
}
