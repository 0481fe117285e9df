use crate::config::ChatConfig;
use crate::core::emotion::EmotionLabel;

/// Formats emotions the way the model is asked to write them: `[a], [b]`.
pub fn valid_emotions_str<'a>(emotions: impl IntoIterator<Item = &'a EmotionLabel>) -> String {
    emotions
        .into_iter()
        .map(|emotion| format!("[{emotion}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the system prompt from the chat templates.
///
/// `{char}` and `{user}` are substituted everywhere, including inside the
/// description and scenario templates, which are then substituted into the
/// system prompt together with `{valid_emotions_str}`.
pub fn render_system_prompt<'a>(
    chat: &ChatConfig,
    emotions: impl IntoIterator<Item = &'a EmotionLabel>,
) -> String {
    let names = |template: &str| {
        template
            .replace("{char}", &chat.char)
            .replace("{user}", &chat.user)
    };

    let char_description = names(&chat.char_description);
    let user_description = names(&chat.user_description);
    let scenario = names(&chat.scenario);

    names(&chat.system_prompt)
        .replace("{char_description}", &char_description)
        .replace("{user_description}", &user_description)
        .replace("{scenario}", &scenario)
        .replace("{valid_emotions_str}", &valid_emotions_str(emotions))
}
