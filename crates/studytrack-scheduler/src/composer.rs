//! Message composition: pure text building, no I/O and no clock.

use studytrack_core::types::{ContentItem, ContentType, Profile, Task};

/// Used when a profile has no usable display name.
pub const FALLBACK_NAME: &str = "Estudante";

pub const VIDEO_ICON: &str = "🎥";
pub const DOCUMENT_ICON: &str = "📄";

pub const NO_MATERIAL_LINE: &str = "Sem material específico hoje. Use suas anotações!";

/// Reply keyword the recipient sends back once the goal is done.
pub const COMPLETION_KEYWORD: &str = "FEITO";

/// First whitespace-separated token of the display name.
pub fn first_name(profile: &Profile) -> &str {
    profile
        .full_name
        .as_deref()
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or(FALLBACK_NAME)
}

pub fn content_icon(content: &ContentItem) -> &'static str {
    match content.content_type {
        ContentType::Video => VIDEO_ICON,
        ContentType::Other => DOCUMENT_ICON,
    }
}

/// The daily goal notification for one task.
pub fn compose(task: &Task, profile: &Profile, content: Option<&ContentItem>) -> String {
    let mut msg = format!(
        "Bom dia, {}! ☀️\n\n\
         Sua meta de hoje na StudyTrack é:\n\
         🎯 *{}*\n\n",
        first_name(profile),
        task.description,
    );

    match content {
        Some(content) => msg.push_str(&format!(
            "Material Recomendado:\n{} {}\n{}\n\n",
            content_icon(content),
            content.title,
            content.url,
        )),
        None => {
            msg.push_str(NO_MATERIAL_LINE);
            msg.push_str("\n\n");
        }
    }

    msg.push_str(&format!(
        "Responda '{COMPLETION_KEYWORD}' quando terminar para manter seu Streak! 🔥"
    ));
    msg
}

/// One-shot greeting sent right after a user binds their WhatsApp number.
pub fn compose_welcome(profile: &Profile) -> String {
    format!(
        "Olá, {}! 👋\n\n\
         Seu WhatsApp foi conectado à StudyTrack com sucesso.\n\
         A partir de agora você recebe aqui, todas as manhãs, a sua meta de estudo do dia.\n\n\
         Bons estudos! 📚",
        first_name(profile),
    )
}
