//! `kinds` subcommand

use crate::domain::WorkflowRegistry;

pub fn run() {
    let registry = WorkflowRegistry::standard();

    for kind in registry.kinds() {
        println!("{kind}");
        if let Ok(definition) = registry.definition(kind) {
            for step in definition.steps() {
                println!("  {step}");
            }
        }
        println!();
    }
}
