//! Command layer: every user-facing operation, composed from store
//! resolution, the branch guard, and the state file operations.
//!
//! Each invocation resolves its store once, guards the branch, then
//! performs its read-mutate-write and one commit.

use std::path::{Path, PathBuf};

use chrono::Local;
use mem_store::docs::{
    self, GOAL_FILE, MEMORY_FILE, PLAYBOOK_FILE, STATE_FILE, summarize,
};
use mem_store::frontmatter;
use mem_store::git::{DEFAULT_BRANCH, GitRepo, TASK_BRANCH_PREFIX};
use mem_store::goal;
use mem_store::index::{IndexStore, JsonIndexStore};
use mem_store::log;
use mem_store::state::{self, Status};
use mem_store::store::{self, STORE_DIR_NAME, StoreHandle};

/// Where a command runs from and where the central store lives.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub cwd: PathBuf,
    pub central_dir: PathBuf,
}

struct ActiveStore {
    repo: GitRepo,
    handle: StoreHandle,
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn task_branch(slug: &str) -> String {
    format!("{TASK_BRANCH_PREFIX}{slug}")
}

/// Resolve the governing store and check out its task branch.
fn open_active(ctx: &CommandContext) -> Result<ActiveStore, String> {
    let index = JsonIndexStore::open(&ctx.central_dir);
    let handle = store::resolve(&ctx.cwd, &ctx.central_dir, &index).ok_or_else(|| {
        format!(
            "no memory store found for {}; run `mem init <slug>` or `mem new <slug>`",
            ctx.cwd.display()
        )
    })?;
    if !handle.is_local && handle.task_branch.is_none() {
        return Err(format!(
            "{} is not mapped to a task; run `mem new <slug>` or `mem switch <slug>`",
            ctx.cwd.display()
        ));
    }

    let repo = GitRepo::new(handle.store_dir.clone());
    store::ensure_branch(&repo, handle.task_branch.as_deref())
        .map_err(|error| error.to_string())?;
    Ok(ActiveStore { repo, handle })
}

/// Resolve the governing store without requiring a task mapping.
fn open_any(ctx: &CommandContext) -> Result<ActiveStore, String> {
    let index = JsonIndexStore::open(&ctx.central_dir);
    let handle = store::resolve(&ctx.cwd, &ctx.central_dir, &index).ok_or_else(|| {
        format!(
            "no memory store found for {}; run `mem init <slug>` or `mem new <slug>`",
            ctx.cwd.display()
        )
    })?;
    let repo = GitRepo::new(handle.store_dir.clone());
    Ok(ActiveStore { repo, handle })
}

fn read_required(store: &ActiveStore, name: &str) -> Result<String, String> {
    docs::read_doc(store.repo.dir(), name)
        .map_err(|error| error.to_string())?
        .ok_or_else(|| format!("{name} not found in store; is a task checked out?"))
}

fn write_and_commit(
    store: &ActiveStore,
    name: &str,
    content: &str,
    message: &str,
) -> Result<(), String> {
    docs::write_doc(store.repo.dir(), name, content).map_err(|error| error.to_string())?;
    docs::commit_paths(&store.repo, &[name], message).map_err(|error| error.to_string())
}

fn seed_default_branch(repo: &GitRepo) -> Result<(), String> {
    docs::write_doc(repo.dir(), PLAYBOOK_FILE, &log::render_log("Playbook"))
        .map_err(|error| error.to_string())?;
    // index.json is working-tree state shared across branches; tracking it
    // would make every checkout fight over it
    docs::write_doc(repo.dir(), ".gitignore", "index.json\n")
        .map_err(|error| error.to_string())?;
    docs::commit_paths(repo, &[PLAYBOOK_FILE, ".gitignore"], "init: memory store")
        .map_err(|error| error.to_string())
}

fn create_task(repo: &GitRepo, slug: &str, goal_text: Option<&str>) -> Result<String, String> {
    let branch = task_branch(slug);
    repo.checkout_new(&branch).map_err(|error| error.to_string())?;

    let date = today();
    let goal_doc = goal::render_goal(slug, goal_text.unwrap_or("(no goal yet)"), &date);
    docs::write_doc(repo.dir(), GOAL_FILE, &goal_doc).map_err(|error| error.to_string())?;
    docs::write_doc(repo.dir(), STATE_FILE, &state::render_state())
        .map_err(|error| error.to_string())?;
    docs::write_doc(repo.dir(), MEMORY_FILE, &log::render_log("Memory"))
        .map_err(|error| error.to_string())?;
    docs::commit_paths(
        repo,
        &[GOAL_FILE, STATE_FILE, MEMORY_FILE],
        &format!("init: {slug}"),
    )
    .map_err(|error| error.to_string())?;
    Ok(branch)
}

pub fn init(ctx: &CommandContext, slug: &str, goal_text: Option<&str>) -> Result<(), String> {
    let store_dir = ctx.cwd.join(STORE_DIR_NAME);
    if store_dir.join(".git").is_dir() {
        return Err(format!(
            "a local store already exists at {}",
            store_dir.display()
        ));
    }

    std::fs::create_dir_all(&store_dir).map_err(|error| error.to_string())?;
    let repo = GitRepo::new(store_dir.clone());
    repo.init().map_err(|error| error.to_string())?;
    seed_default_branch(&repo)?;
    let branch = create_task(&repo, slug, goal_text)?;
    println!(
        "initialized local store at {} on {branch}",
        store_dir.display()
    );
    Ok(())
}

pub fn new_task(ctx: &CommandContext, slug: &str, goal_text: Option<&str>) -> Result<(), String> {
    let repo = GitRepo::new(ctx.central_dir.clone());
    if !ctx.central_dir.join(".git").is_dir() {
        std::fs::create_dir_all(&ctx.central_dir).map_err(|error| error.to_string())?;
        repo.init().map_err(|error| error.to_string())?;
        seed_default_branch(&repo)?;
    }

    let mut index = JsonIndexStore::open(&ctx.central_dir);
    if let Some(existing) = index.lookup(&ctx.cwd) {
        return Err(format!(
            "{} is already mapped to {existing}; run `mem done` or `mem switch <slug>` first",
            ctx.cwd.display()
        ));
    }

    let branch = task_branch(slug);
    if repo
        .branches()
        .map_err(|error| error.to_string())?
        .contains(&branch)
    {
        return Err(format!(
            "branch {branch} already exists; use `mem switch {slug}` to map this directory to it"
        ));
    }

    // new task branches start from the default branch
    store::ensure_branch(&repo, Some(DEFAULT_BRANCH)).map_err(|error| error.to_string())?;
    create_task(&repo, slug, goal_text)?;
    index
        .set(&ctx.cwd, &branch)
        .map_err(|error| error.to_string())?;
    println!(
        "mapped {} to {branch} in central store {}",
        ctx.cwd.display(),
        ctx.central_dir.display()
    );
    Ok(())
}

pub fn status(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let branch = store.repo.current_branch().map_err(|error| error.to_string())?;
    let kind = if store.handle.is_local { "local" } else { "central" };
    println!("store:  {} ({kind})", store.handle.store_dir.display());
    println!("branch: {branch}");

    if let Some(goal_doc) = docs::read_doc(store.repo.dir(), GOAL_FILE)
        .map_err(|error| error.to_string())?
    {
        let (fm, body) = frontmatter::decode(&goal_doc);
        if let Some(task) = fm.get("task") {
            println!("task:   {task}");
        }
        let statement = goal::statement(&body);
        if !statement.is_empty() {
            println!("goal:   {}", summarize(&statement));
        }
        match goal::compute_progress(&body) {
            Some(percent) => println!("progress: {percent}%"),
            None => println!("progress: no criteria"),
        }
    }

    if let Some(state_doc) = docs::read_doc(store.repo.dir(), STATE_FILE)
        .map_err(|error| error.to_string())?
    {
        let (fm, body) = frontmatter::decode(&state_doc);
        let task_status = state::status_of(&fm);
        println!("status: {task_status}");
        if let Some(blocker) = fm.get(state::BLOCKER_KEY) {
            println!("blocker: {blocker}");
        }
        if let Some(step) = state::next_step(&body) {
            println!("next:   {step}");
        }
        let checkpoints = state::checkpoints(&body);
        if !checkpoints.is_empty() {
            println!("recent checkpoints:");
            for entry in checkpoints.iter().rev().take(3) {
                println!("  {entry}");
            }
        }
    }
    Ok(())
}

pub fn show_or_set_goal(ctx: &CommandContext, text: Option<&str>) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let Some(text) = text else {
        println!("{raw}");
        return Ok(());
    };

    let (mut fm, body) = frontmatter::decode(&raw);
    fm.set("updated", today());
    let body = goal::replace_statement(&body, text);
    write_and_commit(
        &store,
        GOAL_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("goal: {}", summarize(text)),
    )?;
    println!("goal updated");
    Ok(())
}

pub fn show_or_set_next(ctx: &CommandContext, text: Option<&str>) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);

    let Some(text) = text else {
        match state::next_step(&body) {
            Some(step) => println!("{step}"),
            None => println!("(no next step set)"),
        }
        return Ok(());
    };

    fm.set("updated", today());
    let body = state::set_next_step(&body, text);
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("next: {}", summarize(text)),
    )?;
    println!("next step updated");
    Ok(())
}

pub fn checkpoint(ctx: &CommandContext, message: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (fm, body) = frontmatter::decode(&raw);
    let body = state::append_checkpoint(&body, &today(), message);
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("checkpoint: {}", summarize(message)),
    )?;
    println!("checkpoint recorded");
    Ok(())
}

pub fn learn(ctx: &CommandContext, insight: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let content = docs::read_doc(store.repo.dir(), MEMORY_FILE)
        .map_err(|error| error.to_string())?
        .unwrap_or_else(|| log::render_log("Memory"));
    let content = log::append_entry(&content, &today(), insight);
    write_and_commit(
        &store,
        MEMORY_FILE,
        &content,
        &format!("learn: {}", summarize(insight)),
    )?;
    println!("learning recorded");
    Ok(())
}

pub fn criteria_add(ctx: &CommandContext, text: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (fm, body) = frontmatter::decode(&raw);
    let mut body = goal::add_criterion(&body, text);
    if let Some(percent) = goal::compute_progress(&body) {
        body = goal::apply_progress(&body, percent);
    }
    write_and_commit(
        &store,
        GOAL_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("criteria: add {}", summarize(text)),
    )?;
    println!("criterion added");
    Ok(())
}

pub fn criteria_check(ctx: &CommandContext, number: usize) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (fm, body) = frontmatter::decode(&raw);
    let Some(mut body) = goal::check_criterion(&body, number) else {
        println!("no unchecked criterion #{number}; run `mem criteria list`");
        return Ok(());
    };
    if let Some(percent) = goal::compute_progress(&body) {
        body = goal::apply_progress(&body, percent);
    }
    write_and_commit(
        &store,
        GOAL_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("criteria: check #{number}"),
    )?;
    println!("criterion #{number} checked");
    Ok(())
}

pub fn criteria_list(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (_, body) = frontmatter::decode(&raw);
    let criteria = goal::list_criteria(&body);
    if criteria.is_empty() {
        println!("no criteria defined; run `mem criteria add <text>`");
        return Ok(());
    }

    // numbers refer to unchecked entries only, matching `criteria check`
    let mut number = 0usize;
    for criterion in criteria {
        if criterion.checked {
            println!("   [x] {}", criterion.text);
        } else {
            number += 1;
            println!("{number}. [ ] {}", criterion.text);
        }
    }
    Ok(())
}

pub fn progress(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (fm, body) = frontmatter::decode(&raw);
    let Some(percent) = goal::compute_progress(&body) else {
        println!("no criteria defined; run `mem criteria add <text>`");
        return Ok(());
    };

    let updated = goal::apply_progress(&body, percent);
    if updated != body {
        write_and_commit(
            &store,
            GOAL_FILE,
            &frontmatter::encode(&fm, &updated),
            &format!("progress: {percent}%"),
        )?;
    }
    println!("progress: {percent}%");
    Ok(())
}

pub fn constraint_add(ctx: &CommandContext, text: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (fm, body) = frontmatter::decode(&raw);
    let body = goal::add_constraint(&body, text);
    write_and_commit(
        &store,
        GOAL_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("constraint: {}", summarize(text)),
    )?;
    println!("constraint added");
    Ok(())
}

pub fn constraint_list(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, GOAL_FILE)?;
    let (_, body) = frontmatter::decode(&raw);
    let constraints = goal::list_constraints(&body);
    if constraints.is_empty() {
        println!("no constraints recorded");
        return Ok(());
    }
    for (position, text) in constraints.iter().enumerate() {
        println!("{}. {text}", position + 1);
    }
    Ok(())
}

pub fn context(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    for name in [GOAL_FILE, STATE_FILE, MEMORY_FILE] {
        if let Some(text) = docs::read_doc(store.repo.dir(), name)
            .map_err(|error| error.to_string())?
        {
            println!("=== {name} ===\n{}\n", text.trim_end());
        }
    }

    // the playbook lives on the default branch; read it through git when
    // a task branch is checked out
    let playbook = match docs::read_doc(store.repo.dir(), PLAYBOOK_FILE)
        .map_err(|error| error.to_string())?
    {
        Some(text) => Some(text),
        None => store
            .repo
            .show(&format!("{DEFAULT_BRANCH}:{PLAYBOOK_FILE}"))
            .ok(),
    };
    if let Some(text) = playbook {
        println!("=== {PLAYBOOK_FILE} ===\n{}", text.trim_end());
    }
    Ok(())
}

pub fn tasks(ctx: &CommandContext) -> Result<(), String> {
    let store = open_any(ctx)?;
    let current = store.repo.current_branch().unwrap_or_default();
    let branches = store.repo.branches().map_err(|error| error.to_string())?;
    let task_branches: Vec<&String> = branches
        .iter()
        .filter(|name| name.starts_with(TASK_BRANCH_PREFIX))
        .collect();
    if task_branches.is_empty() {
        println!("no task branches");
    }
    for name in task_branches {
        let marker = if *name == current { "*" } else { " " };
        println!("{marker} {name}");
    }

    if !store.handle.is_local {
        let index = JsonIndexStore::open(&ctx.central_dir);
        let entries = index.entries();
        if !entries.is_empty() {
            println!("\nmapped directories:");
            for (path, branch) in entries {
                println!("  {} -> {branch}", path.display());
            }
        }
    }
    Ok(())
}

pub fn switch(ctx: &CommandContext, slug: &str) -> Result<(), String> {
    let store = open_any(ctx)?;
    let branch = task_branch(slug);
    if !store
        .repo
        .branches()
        .map_err(|error| error.to_string())?
        .contains(&branch)
    {
        return Err(format!("no branch {branch}; run `mem new {slug}` first"));
    }

    store::ensure_branch(&store.repo, Some(&branch)).map_err(|error| error.to_string())?;
    if !store.handle.is_local {
        let mut index = JsonIndexStore::open(&ctx.central_dir);
        index
            .set(&ctx.cwd, &branch)
            .map_err(|error| error.to_string())?;
    }
    println!("switched to {branch}");
    Ok(())
}

pub fn stuck(ctx: &CommandContext, reason: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);
    let current = state::status_of(&fm);
    if !current.can_become(Status::Blocked) {
        println!("cannot block a {current} task");
        return Ok(());
    }

    fm.set(state::STATUS_KEY, Status::Blocked.as_str());
    fm.set(state::BLOCKER_KEY, reason);
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("stuck: {}", summarize(reason)),
    )?;
    println!("task marked blocked");
    Ok(())
}

pub fn clear(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);
    let current = state::status_of(&fm);
    if !current.can_become(Status::Active) {
        println!("task is {current}, nothing to clear");
        return Ok(());
    }

    fm.set(state::STATUS_KEY, Status::Active.as_str());
    fm.remove(state::BLOCKER_KEY);
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        "clear: task unblocked",
    )?;
    println!("task active again");
    Ok(())
}

pub fn done(ctx: &CommandContext, delete_branch: bool) -> Result<(), String> {
    let store = open_active(ctx)?;
    let branch = store.repo.current_branch().map_err(|error| error.to_string())?;
    if !branch.starts_with(TASK_BRANCH_PREFIX) {
        return Err(format!("{branch} is not a task branch"));
    }

    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);
    let current = state::status_of(&fm);
    if !current.can_become(Status::Done) {
        return Err(format!(
            "cannot complete a {current} task; run `mem clear` first"
        ));
    }

    fm.set(state::STATUS_KEY, Status::Done.as_str());
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("done: {branch}"),
    )?;

    let learnings = docs::read_doc(store.repo.dir(), MEMORY_FILE)
        .map_err(|error| error.to_string())?
        .map(|content| log::entries(&content))
        .unwrap_or_default();

    store
        .repo
        .checkout(DEFAULT_BRANCH)
        .map_err(|error| error.to_string())?;

    if !learnings.is_empty() {
        let playbook = docs::read_doc(store.repo.dir(), PLAYBOOK_FILE)
            .map_err(|error| error.to_string())?
            .unwrap_or_else(|| log::render_log("Playbook"));
        let mut content = playbook.trim_end().to_string();
        for entry in &learnings {
            content.push('\n');
            content.push_str(entry);
        }
        content.push('\n');
        write_and_commit(
            &store,
            PLAYBOOK_FILE,
            &content,
            &format!("done: promote learnings from {branch}"),
        )?;
    }

    if let Err(error) = store.repo.merge(&branch) {
        // do not leave the user on a half-merged default branch; the
        // promoted learnings commit stays
        let _ = store.repo.checkout(&branch);
        return Err(format!("merge of {branch} failed: {error}"));
    }

    if delete_branch {
        store
            .repo
            .delete_branch(&branch)
            .map_err(|error| error.to_string())?;
    }

    if !store.handle.is_local {
        let mut index = JsonIndexStore::open(&ctx.central_dir);
        for (path, mapped) in index.entries() {
            if mapped == branch {
                index.remove(&path).map_err(|error| error.to_string())?;
            }
        }
    }

    println!("{branch} merged into {DEFAULT_BRANCH}");
    Ok(())
}

pub fn sync(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    if store.repo.is_dirty().map_err(|error| error.to_string())? {
        store.repo.add_all().map_err(|error| error.to_string())?;
        store
            .repo
            .commit("sync: checkpoint work in progress")
            .map_err(|error| error.to_string())?;
        println!("committed outstanding changes");
    }

    if store.repo.has_remote().map_err(|error| error.to_string())? {
        store.repo.pull_rebase().map_err(|error| error.to_string())?;
        store.repo.push().map_err(|error| error.to_string())?;
        println!("synced with remote");
    } else {
        println!("no remote configured");
    }
    Ok(())
}

pub fn set_value(ctx: &CommandContext, key: &str, value: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);
    fm.set(key, value);
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("set: {key}={}", summarize(value)),
    )?;
    println!("{key} set");
    Ok(())
}

pub fn get_value(ctx: &CommandContext, key: &str) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (fm, _) = frontmatter::decode(&raw);
    match fm.get(key) {
        Some(value) => println!("{value}"),
        None => println!("(unset)"),
    }
    Ok(())
}

pub fn append(ctx: &CommandContext, file: &str, text: &str) -> Result<(), String> {
    let Some(name) = resolve_doc_name(file) else {
        println!("unknown file '{file}'; expected goal, state, memory, or playbook");
        return Ok(());
    };
    let store = open_active(ctx)?;

    if name == PLAYBOOK_FILE {
        return append_playbook(&store, text);
    }

    let raw = docs::read_doc(store.repo.dir(), name)
        .map_err(|error| error.to_string())?
        .unwrap_or_default();
    let content = if name == MEMORY_FILE {
        log::append_entry(&raw, &today(), text)
    } else {
        let (fm, body) = frontmatter::decode(&raw);
        let mut body = body.trim_end().to_string();
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(text);
        frontmatter::encode(&fm, &body)
    };
    write_and_commit(
        &store,
        name,
        &content,
        &format!("append: {}", summarize(text)),
    )?;
    println!("appended to {name}");
    Ok(())
}

/// Playbook appends always land on the default branch; hop over and back.
fn append_playbook(store: &ActiveStore, text: &str) -> Result<(), String> {
    let original = store.repo.current_branch().map_err(|error| error.to_string())?;
    store::ensure_branch(&store.repo, Some(DEFAULT_BRANCH))
        .map_err(|error| error.to_string())?;

    let result = (|| {
        let raw = docs::read_doc(store.repo.dir(), PLAYBOOK_FILE)
            .map_err(|error| error.to_string())?
            .unwrap_or_else(|| log::render_log("Playbook"));
        let content = log::append_entry(&raw, &today(), text);
        write_and_commit(
            store,
            PLAYBOOK_FILE,
            &content,
            &format!("append: {}", summarize(text)),
        )
    })();

    if original != DEFAULT_BRANCH {
        store
            .repo
            .checkout(&original)
            .map_err(|error| error.to_string())?;
    }
    result?;
    println!("appended to {PLAYBOOK_FILE}");
    Ok(())
}

fn resolve_doc_name(file: &str) -> Option<&'static str> {
    match file.trim().trim_end_matches(".md") {
        "goal" => Some(GOAL_FILE),
        "state" => Some(STATE_FILE),
        "memory" => Some(MEMORY_FILE),
        "playbook" => Some(PLAYBOOK_FILE),
        _ => None,
    }
}

pub fn wake(ctx: &CommandContext, schedule: &str, command: Option<&str>) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (mut fm, body) = frontmatter::decode(&raw);
    fm.set(state::WAKE_KEY, schedule);
    if let Some(command) = command {
        fm.set(state::WAKE_COMMAND_KEY, command);
    }
    write_and_commit(
        &store,
        STATE_FILE,
        &frontmatter::encode(&fm, &body),
        &format!("wake: {}", summarize(schedule)),
    )?;
    println!("wake schedule stored");
    Ok(())
}

pub fn cron_export(ctx: &CommandContext) -> Result<(), String> {
    let store = open_active(ctx)?;
    let raw = read_required(&store, STATE_FILE)?;
    let (fm, _) = frontmatter::decode(&raw);
    let Some(schedule) = fm.get(state::WAKE_KEY) else {
        println!("no wake schedule set; run `mem wake <schedule>`");
        return Ok(());
    };
    let branch = store.repo.current_branch().map_err(|error| error.to_string())?;
    let command = fm.get(state::WAKE_COMMAND_KEY).unwrap_or("mem status");

    print!("{}", render_crontab(&branch, schedule, &ctx.cwd, command));
    Ok(())
}

/// A crontab entry for the stored wake schedule. The schedule is free
/// text, so the five time fields are placeholders the user fills in to
/// match it.
fn render_crontab(branch: &str, schedule: &str, dir: &Path, command: &str) -> String {
    format!(
        "# crontab entry for {branch}; set the time fields to match \"{schedule}\"\n\
         * * * * * cd {} && {command}\n",
        dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mem_store::index::MemoryIndexStore;
    use tempfile::{TempDir, tempdir};

    fn test_ctx() -> (TempDir, CommandContext) {
        for key in [
            "GIT_AUTHOR_NAME",
            "GIT_COMMITTER_NAME",
        ] {
            std::env::set_var(key, "mem test");
        }
        for key in ["GIT_AUTHOR_EMAIL", "GIT_COMMITTER_EMAIL"] {
            std::env::set_var(key, "mem@test.invalid");
        }

        let root = tempdir().expect("temp dir");
        let cwd = root.path().join("project");
        std::fs::create_dir_all(&cwd).expect("create cwd");
        let central_dir = root.path().join("central");
        let ctx = CommandContext { cwd, central_dir };
        (root, ctx)
    }

    fn read_store_doc(ctx: &CommandContext, name: &str) -> String {
        std::fs::read_to_string(ctx.cwd.join(STORE_DIR_NAME).join(name)).expect("read doc")
    }

    #[test]
    fn init_seeds_main_and_creates_task_branch() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", Some("Build X")).expect("init");

        let store_dir = ctx.cwd.join(STORE_DIR_NAME);
        let repo = GitRepo::new(store_dir.clone());
        assert_eq!(repo.current_branch().expect("branch"), "task/demo");

        let goal_doc = read_store_doc(&ctx, GOAL_FILE);
        let (fm, body) = frontmatter::decode(&goal_doc);
        assert_eq!(fm.get("task"), Some("demo"));
        assert!(body.starts_with("Build X"));
        assert!(goal::list_criteria(&body).is_empty());

        // main holds only the playbook and gitignore
        repo.checkout(DEFAULT_BRANCH).expect("checkout main");
        assert!(store_dir.join(PLAYBOOK_FILE).exists());
        assert!(!store_dir.join(GOAL_FILE).exists());
        repo.checkout("task/demo").expect("checkout back");
    }

    #[test]
    fn end_to_end_checkpoint_criteria_progress() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", Some("Build X")).expect("init");

        checkpoint(&ctx, "step 1").expect("checkpoint");
        let state_doc = read_store_doc(&ctx, STATE_FILE);
        let date = today();
        assert!(state_doc.contains(&format!("- [x] {date}: step 1")));

        criteria_add(&ctx, "Ship it").expect("add");
        criteria_check(&ctx, 1).expect("check");
        progress(&ctx).expect("progress");

        let goal_doc = read_store_doc(&ctx, GOAL_FILE);
        assert_eq!(goal_doc.matches("- [x] Ship it").count(), 1);
        assert!(goal_doc.contains("## Progress: 100%"));

        let repo = GitRepo::new(ctx.cwd.join(STORE_DIR_NAME));
        let history = repo.log_oneline(10).expect("log");
        assert!(history.contains("checkpoint: step 1"));
        assert!(history.contains("criteria: check #1"));
    }

    #[test]
    fn criteria_check_out_of_range_leaves_tree_untouched() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");
        let before = read_store_doc(&ctx, GOAL_FILE);

        criteria_check(&ctx, 3).expect("out of range is a usage message");
        assert_eq!(read_store_doc(&ctx, GOAL_FILE), before);
    }

    #[test]
    fn stuck_and_clear_cycle_status() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");

        stuck(&ctx, "waiting on credentials").expect("stuck");
        let (fm, _) = frontmatter::decode(&read_store_doc(&ctx, STATE_FILE));
        assert_eq!(state::status_of(&fm), Status::Blocked);
        assert_eq!(fm.get(state::BLOCKER_KEY), Some("waiting on credentials"));

        clear(&ctx).expect("clear");
        let (fm, _) = frontmatter::decode(&read_store_doc(&ctx, STATE_FILE));
        assert_eq!(state::status_of(&fm), Status::Active);
        assert_eq!(fm.get(state::BLOCKER_KEY), None);
    }

    #[test]
    fn done_promotes_learnings_and_merges_to_main() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", Some("Build X")).expect("init");
        learn(&ctx, "git is the database").expect("learn");

        done(&ctx, false).expect("done");

        let repo = GitRepo::new(ctx.cwd.join(STORE_DIR_NAME));
        assert_eq!(repo.current_branch().expect("branch"), DEFAULT_BRANCH);

        let playbook = read_store_doc(&ctx, PLAYBOOK_FILE);
        assert!(playbook.contains("git is the database"));

        // merge carried the task documents onto main
        let (fm, _) = frontmatter::decode(&read_store_doc(&ctx, STATE_FILE));
        assert_eq!(state::status_of(&fm), Status::Done);
    }

    #[test]
    fn done_refuses_blocked_task() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");
        stuck(&ctx, "blocked").expect("stuck");

        let error = done(&ctx, false).expect_err("blocked task cannot complete");
        assert!(error.contains("blocked"));
    }

    #[test]
    fn new_task_maps_directory_into_central_store() {
        let (_root, ctx) = test_ctx();
        new_task(&ctx, "central-demo", Some("Do the thing")).expect("new");

        let index = JsonIndexStore::open(&ctx.central_dir);
        assert_eq!(
            index.lookup(&ctx.cwd).as_deref(),
            Some("task/central-demo")
        );

        let repo = GitRepo::new(ctx.central_dir.clone());
        assert_eq!(repo.current_branch().expect("branch"), "task/central-demo");
        assert!(ctx.central_dir.join(GOAL_FILE).exists());
    }

    #[test]
    fn resolver_prefers_local_store_over_central_mapping() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "local-task", None).expect("init");

        let mut index = MemoryIndexStore::new();
        index.set(&ctx.cwd, "task/central").expect("set");
        // a central repo also exists
        std::fs::create_dir_all(ctx.central_dir.join(".git")).expect("central");

        let handle = store::resolve(&ctx.cwd, &ctx.central_dir, &index).expect("resolved");
        assert!(handle.is_local);
        assert_eq!(handle.store_dir, ctx.cwd.join(STORE_DIR_NAME));
    }

    #[test]
    fn set_and_get_round_trip_arbitrary_keys() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");

        set_value(&ctx, "reviewer", "alex").expect("set");
        let (fm, _) = frontmatter::decode(&read_store_doc(&ctx, STATE_FILE));
        assert_eq!(fm.get("reviewer"), Some("alex"));
    }

    #[test]
    fn wake_preserves_colons_in_schedule() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");

        wake(&ctx, "8:30am daily", Some("mem status")).expect("wake");
        let (fm, _) = frontmatter::decode(&read_store_doc(&ctx, STATE_FILE));
        assert_eq!(fm.get(state::WAKE_KEY), Some("8:30am daily"));
        assert_eq!(fm.get(state::WAKE_COMMAND_KEY), Some("mem status"));
    }

    #[test]
    fn cron_export_renders_a_crontab_line() {
        let snippet = render_crontab("task/demo", "8:30am daily", Path::new("/work"), "mem status");
        assert!(snippet.contains("task/demo"));
        assert!(snippet.contains("8:30am daily"));
        assert!(snippet.contains("* * * * * cd /work && mem status"));
    }

    #[test]
    fn append_playbook_from_task_branch_returns_to_task() {
        let (_root, ctx) = test_ctx();
        init(&ctx, "demo", None).expect("init");

        append(&ctx, "playbook", "always write tests").expect("append");

        let repo = GitRepo::new(ctx.cwd.join(STORE_DIR_NAME));
        assert_eq!(repo.current_branch().expect("branch"), "task/demo");
        let playbook = repo
            .show(&format!("{DEFAULT_BRANCH}:{PLAYBOOK_FILE}"))
            .expect("playbook on main");
        assert!(playbook.contains("always write tests"));
    }
}
