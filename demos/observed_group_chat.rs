//! Observed group chat demonstration
//!
//! A coordinator hands a travel-planning task to a small team of simulated
//! agents. Every agent records its turn in a shared tracks store, and the
//! observer turns the conversation into one trace with a cost-annotated
//! generation span per turn.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example observed_group_chat
//! cargo run --example observed_group_chat -- traces.jsonl
//! ```
//!
//! Credentials come from `LANGFUSE_PUBLIC_KEY` / `LANGFUSE_SECRET_KEY` (a
//! `.env` file works too). Without them the demo uses placeholder keys.

use anyhow::Context;
use chrono::Utc;
use langfused::prelude::*;
use langfused::sink::RecordedTrace;
use langfused::tracer::{SPEAKER_SELECTION_AGENT, USER_PROXY};
use std::sync::Arc;
use tracing::info;

const MODEL: &str = "gpt-4o-mini";

/// Agent with a canned reply that records each turn it takes.
struct SimulatedAgent {
    name: String,
    reply: String,
    store: TracksStore,
}

impl SimulatedAgent {
    fn new(name: &str, reply: &str, store: &TracksStore) -> Self {
        Self {
            name: name.to_string(),
            reply: reply.to_string(),
            store: store.clone(),
        }
    }

    fn respond(&self, message: &str) -> String {
        let start_time = Utc::now();
        let reply = self.reply.clone();
        self.store
            .record(&self.name, start_time, Utc::now(), message, reply.as_str());
        reply
    }
}

impl NamedAgent for SimulatedAgent {
    fn name(&self) -> &str {
        &self.name
    }
}

struct GroupChat {
    manager: SimulatedAgent,
    user: SimulatedAgent,
    members: Vec<SimulatedAgent>,
    store: TracksStore,
}

impl GroupChat {
    fn new(store: &TracksStore) -> Self {
        Self {
            manager: SimulatedAgent::new("chat_manager", "", store),
            user: SimulatedAgent::new(USER_PROXY, "Thanks, that works.", store),
            members: vec![
                SimulatedAgent::new(
                    "planner",
                    "Day one: Gulbenkian museum. Day two: Belem tower and pasteis. Day three: Sintra.",
                    store,
                ),
                SimulatedAgent::new(
                    "critic",
                    "Sintra needs an early train; move the Belem visit to the afternoon.",
                    store,
                ),
            ],
            store: store.clone(),
        }
    }

    /// Run one round: the manager picks each member in turn, then the user closes.
    fn run(&self, task: &str) -> ChatResult {
        let mut message = task.to_string();
        let mut history = vec![serde_json::json!({"name": USER_PROXY, "content": task})];

        for member in &self.members {
            let start_time = Utc::now();
            self.store.record(
                SPEAKER_SELECTION_AGENT,
                start_time,
                Utc::now(),
                format!("Who should speak next about: {}", message),
                member.name.as_str(),
            );

            message = member.respond(&message);
            history.push(serde_json::json!({"name": member.name, "content": message}));
        }
        self.user.respond(&message);

        let mut result = ChatResult::new(message.clone()).with_model_usage(MODEL, 420, 96, 0.000121);
        result.chat_history = history;
        result
    }
}

fn print_trace(trace: &RecordedTrace) {
    println!("{}", "=".repeat(72));
    println!("Trace {} ({})", trace.fields.name, trace.id);
    println!("  user:    {}", trace.fields.user_id);
    println!("  session: {}", trace.fields.session_id);
    for generation in &trace.generations {
        match &generation.usage {
            Some(usage) => println!(
                "  - {:<14} {:>4} in {:>4} out  ${:.8}",
                generation.fields.name,
                usage.input_tokens(),
                usage.output_tokens(),
                usage.total_cost()
            ),
            None => println!("  - {:<14} (no usage)", generation.fields.name),
        }
    }
    println!("{}", "=".repeat(72));
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = SinkConfig::from_env().context("reading sink configuration")?;
    if config.validate().is_err() {
        info!("No Langfuse credentials configured, using placeholder keys");
        config = config.with_credentials("pk-lf-demo", "sk-lf-demo");
    }

    let memory = MemorySink::new(config.clone());
    let sink: Arc<dyn TraceSink> = match std::env::args().nth(1) {
        Some(path) => Arc::new(connect(JsonlSink::open(config, &path)?)?),
        None => Arc::new(connect(memory.clone())?),
    };

    let store = TracksStore::default();
    let chat = GroupChat::new(&store);

    let mut observer = Observer::new(sink);
    observer.set_tracks_store(&store)?;
    observer.set_coordinator_agent(&chat.manager);

    let task = "Plan a three day trip to Lisbon with one museum per day.";
    let observation = observer.observe(
        ObservationOptions::new()
            .with_name("lisbon_trip")
            .with_tags(["demo", "group-chat"]),
        || {
            let result = chat.run(task);
            let final_output = result.summary.clone();
            Ok::<_, anyhow::Error>((result, final_output, task.to_string()))
        },
    )?;

    let summary = &observation.summary;
    println!(
        "\n{} spans on {}, {} tokens, ${:.8}\n",
        summary.spans.len(),
        summary.model.as_deref().unwrap_or("no model"),
        summary.total_tokens(),
        summary.total_cost()
    );

    for trace in memory.traces() {
        print_trace(&trace);
    }

    Ok(())
}
