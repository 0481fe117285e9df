use std::path::PathBuf;

use super::SessionConfig;
use super::yaml::YamlConfig;

/// Applies YAML values on top of an environment-derived configuration.
pub(super) fn merge_config(mut config: SessionConfig, yaml: Option<YamlConfig>) -> SessionConfig {
    let Some(yaml) = yaml else {
        return config;
    };

    if let Some(tts) = yaml.tts {
        let target = &mut config.tts;
        if let Some(engine) = tts.engine {
            target.engine = engine;
        }
        if let Some(dir) = tts.references_dir {
            target.references_dir = PathBuf::from(dir);
        }
        if let Some(rate) = tts.sample_rate {
            target.sample_rate = rate;
        }
        if let Some(channels) = tts.channels {
            target.channels = channels;
        }
        if let Some(path) = tts.output_path {
            target.output_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = tts.poll_interval_ms {
            target.poll_interval_ms = ms;
        }
        if let Some(ms) = tts.idle_interval_ms {
            target.idle_interval_ms = ms;
        }
        if let Some(ms) = tts.completion_settle_ms {
            target.completion_settle_ms = ms;
        }
    }

    if let Some(llm) = yaml.llm {
        let target = &mut config.llm;
        if let Some(provider) = llm.provider {
            target.provider = provider;
        }
        if let Some(script) = llm.script {
            target.script = script;
        }
        if let Some(tokens) = llm.max_history_tokens {
            target.max_history_tokens = tokens;
        }
        if let Some(path) = llm.payload_path {
            target.payload_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = llm.token_delay_ms {
            target.token_delay_ms = ms;
        }
    }

    if let Some(chat) = yaml.chat {
        let target = &mut config.chat;
        if let Some(char_name) = chat.char {
            target.char = char_name;
        }
        if let Some(user) = chat.user {
            target.user = user;
        }
        if let Some(description) = chat.char_description {
            target.char_description = description;
        }
        if let Some(description) = chat.user_description {
            target.user_description = description;
        }
        if let Some(scenario) = chat.scenario {
            target.scenario = scenario;
        }
        if let Some(prompt) = chat.system_prompt {
            target.system_prompt = prompt;
        }
    }

    if let Some(display) = yaml.display {
        let target = &mut config.display;
        if let Some(print) = display.print_emotions {
            target.print_emotions = print;
        }
        if let Some(print) = display.print_llm_text {
            target.print_llm_text = print;
        }
        if let Some(debug) = display.debug {
            target.debug = debug;
        }
    }

    config
}
