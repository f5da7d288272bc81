//! Interactive questions, behind a trait so resolution can run without a terminal.

use inquire::validator::Validation;
use inquire::{Confirm, MultiSelect, Select, Text};

use crate::error::GridCliError;
use crate::profile::Network;
use crate::resolve::{Connectivity, Field, NetworkAccess};
use crate::validators;

pub trait Prompter {
    /// Ask for a free-text field, offering `default` if there is one.
    fn text(&mut self, field: Field, default: Option<&str>) -> Result<String, GridCliError>;

    fn network_access(&mut self, default: Connectivity) -> Result<Connectivity, GridCliError>;

    /// `None` means "pick a node for me".
    fn node_id(&mut self) -> Result<Option<u32>, GridCliError>;

    fn network(&mut self, default: Network) -> Result<Network, GridCliError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, GridCliError>;
}

// ── terminal prompts ─────────────────────────────────────

pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn text(&mut self, field: Field, default: Option<&str>) -> Result<String, GridCliError> {
        let message = match default {
            Some(_) => format!("{}, or press 'Enter' for default:", field.message()),
            None => format!("{}:", field.message()),
        };
        let mut prompt = Text::new(&message).with_validator(move |input: &str| {
            Ok(match field.validate(input) {
                Ok(()) => Validation::Valid,
                Err(v) => Validation::Invalid(v.to_string().into()),
            })
        });
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        prompt.prompt().map_err(map_inquire_err)
    }

    fn network_access(&mut self, default: Connectivity) -> Result<Connectivity, GridCliError> {
        let defaults: Vec<usize> = NetworkAccess::ALL
            .iter()
            .enumerate()
            .filter(|(_, a)| default.contains(**a))
            .map(|(i, _)| i)
            .collect();

        let chosen = MultiSelect::new(
            "Network access: What network would you like to add?",
            NetworkAccess::ALL.to_vec(),
        )
        .with_default(&defaults)
        .with_validator(|choices: &[inquire::list_option::ListOption<&NetworkAccess>]| {
            let selection: Connectivity = choices.iter().map(|c| *c.value).collect();
            Ok(match validators::network_access(&selection) {
                Ok(()) => Validation::Valid,
                Err(v) => Validation::Invalid(v.to_string().into()),
            })
        })
        .prompt()
        .map_err(map_inquire_err)?;

        Ok(chosen.into_iter().collect())
    }

    fn node_id(&mut self) -> Result<Option<u32>, GridCliError> {
        let answer = Text::new(
            "Specify a node to deploy on, or leave blank to let us choose one based on your specifications.",
        )
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                return Ok(Validation::Valid);
            }
            Ok(match validators::node_id(input) {
                Ok(()) => Validation::Valid,
                Err(v) => Validation::Invalid(v.to_string().into()),
            })
        })
        .prompt()
        .map_err(map_inquire_err)?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        answer
            .parse()
            .map(Some)
            .map_err(|_| GridCliError::Validation {
                message: format!("node id must be a number (got '{answer}')"),
            })
    }

    fn network(&mut self, default: Network) -> Result<Network, GridCliError> {
        let cursor = Network::ALL.iter().position(|n| *n == default).unwrap_or(0);
        Select::new("Select the network environment:", Network::ALL.to_vec())
            .with_starting_cursor(cursor)
            .prompt()
            .map_err(map_inquire_err)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, GridCliError> {
        Confirm::new(message)
            .with_default(default)
            .prompt()
            .map_err(map_inquire_err)
    }
}

// ── non-interactive answers ──────────────────────────────

/// Answers every question with its default. Fields without a default are
/// required options in non-interactive mode.
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn text(&mut self, field: Field, default: Option<&str>) -> Result<String, GridCliError> {
        default
            .map(str::to_string)
            .ok_or_else(|| GridCliError::OptionMissing {
                message: format!(
                    "the `{}` option is required when not running in interactive mode",
                    field.flag()
                ),
            })
    }

    fn network_access(&mut self, default: Connectivity) -> Result<Connectivity, GridCliError> {
        Ok(default)
    }

    fn node_id(&mut self) -> Result<Option<u32>, GridCliError> {
        Ok(None)
    }

    fn network(&mut self, default: Network) -> Result<Network, GridCliError> {
        Ok(default)
    }

    fn confirm(&mut self, _message: &str, default: bool) -> Result<bool, GridCliError> {
        Ok(default)
    }
}

fn map_inquire_err(e: inquire::InquireError) -> GridCliError {
    match e {
        inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
            GridCliError::PromptCancelled
        }
        other => GridCliError::Validation {
            message: format!("prompt error: {other}"),
        },
    }
}

// ── scripted answers for tests ───────────────────────────

/// Replays queued answers; anything not scripted falls back to the default.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedPrompter {
    texts: Vec<(Field, String)>,
    access: std::collections::VecDeque<Connectivity>,
    node: Option<u32>,
    network: Option<Network>,
    confirms: std::collections::VecDeque<bool>,
    asked: Vec<Field>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn answer(mut self, field: Field, value: &str) -> Self {
        self.texts.push((field, value.to_string()));
        self
    }

    pub fn access(mut self, selection: Connectivity) -> Self {
        self.access.push_back(selection);
        self
    }

    pub fn node(mut self, node: Option<u32>) -> Self {
        self.node = node;
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_confirm(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }

    pub fn was_asked(&self, field: Field) -> bool {
        self.asked.contains(&field)
    }

    pub fn times_asked(&self, field: Field) -> usize {
        self.asked.iter().filter(|f| **f == field).count()
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn text(&mut self, field: Field, default: Option<&str>) -> Result<String, GridCliError> {
        self.asked.push(field);
        if let Some(pos) = self.texts.iter().position(|(f, _)| *f == field) {
            return Ok(self.texts.remove(pos).1);
        }
        DefaultsPrompter.text(field, default)
    }

    fn network_access(&mut self, default: Connectivity) -> Result<Connectivity, GridCliError> {
        Ok(self.access.pop_front().unwrap_or(default))
    }

    fn node_id(&mut self) -> Result<Option<u32>, GridCliError> {
        Ok(self.node)
    }

    fn network(&mut self, default: Network) -> Result<Network, GridCliError> {
        Ok(self.network.unwrap_or(default))
    }

    fn confirm(&mut self, _message: &str, default: bool) -> Result<bool, GridCliError> {
        Ok(self.confirms.pop_front().unwrap_or(default))
    }
}
