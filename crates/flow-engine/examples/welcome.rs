//! Runs the canned welcome flow against console-logging collaborators.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example welcome
//! ```

use async_trait::async_trait;
use flow_dsl::welcome_flow;
use flow_engine::{
    Actuator, Collaborators, CommandResult, ExecutionOptions, FlowCallbacks, FlowEngine, Voice,
};
use std::sync::Arc;

struct ConsoleActuator;

#[async_trait]
impl Actuator for ConsoleActuator {
    async fn stand(&self) -> CommandResult {
        println!("[actuator] stand");
        Ok(())
    }
    async fn sit(&self) -> CommandResult {
        println!("[actuator] sit");
        Ok(())
    }
    async fn stop(&self) -> CommandResult {
        println!("[actuator] stop");
        Ok(())
    }
    async fn drive(&self, vx: f64, vy: f64, vyaw: f64) -> CommandResult {
        println!("[actuator] drive vx={:.2} vy={:.2} vyaw={:.2}", vx, vy, vyaw);
        Ok(())
    }
    async fn trick(&self, command: &str) -> CommandResult {
        println!("[actuator] trick {}", command);
        Ok(())
    }
}

struct ConsoleVoice;

#[async_trait]
impl Voice for ConsoleVoice {
    async fn speak(&self, text: &str) -> CommandResult {
        println!("[voice] {}", text);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let collaborators = Collaborators::new()
        .with_actuator(Arc::new(ConsoleActuator))
        .with_voice(Arc::new(ConsoleVoice));

    let engine = FlowEngine::new(collaborators).with_callbacks(
        FlowCallbacks::new()
            .on_action_start(|name| println!("-> {}", name))
            .on_flow_complete(|report| println!("flow {}", report.status)),
    );

    let flow = welcome_flow(1.5);
    match engine.execute(&flow, ExecutionOptions::new()).await {
        Ok(report) => println!("final pose {}", report.final_pose),
        Err(err) => eprintln!("execution error: {}", err),
    }
}
