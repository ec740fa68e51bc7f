//! Prompt construction.
//!
//! Everything here is a pure function of its inputs: the working directory
//! and model capabilities are passed in explicitly rather than read from the
//! process environment.

pub mod responses;

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::llm::{ChatMessage, ContentPart, Role};

const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Inputs that shape the system prompt.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub cwd: PathBuf,
    pub supports_computer_use: bool,
    pub custom_instructions: Option<String>,
}

/// Build the system prompt.
pub fn system_prompt(ctx: &PromptContext) -> String {
    let mut prompt = format!(
        "You are an AI assistant focused on helping users with their tasks. You communicate clearly and directly, providing relevant information and solutions.

Current Working Directory: {}

Instructions:
1. Analyze the user's request carefully
2. Provide clear and concise responses
3. When handling code or technical tasks, explain your approach
4. If you encounter errors or issues, explain them clearly

Remember to:
- Be precise and accurate in your responses
- Provide context when necessary
- Handle errors gracefully
- Follow best practices for any technical tasks",
        ctx.cwd.display()
    );

    if ctx.supports_computer_use {
        prompt.push_str(
            "

Visual Input:
The user may attach screenshots or other images to a task. Examine them closely and refer to what they show when it is relevant to your answer.",
        );
    }

    if let Some(instructions) = ctx
        .custom_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        prompt.push_str("\n\n====\n\nUSER'S CUSTOM INSTRUCTIONS\n\nThe following additional instructions are provided by the user, and should be followed to the best of your ability.\n\n");
        prompt.push_str(instructions);
    }

    prompt
}

/// Build the message list for a task: a single user turn holding the
/// `<task>`-wrapped text followed by one image part per image, in order.
pub fn user_messages(task: &str, images: &[String]) -> Vec<ChatMessage> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(ContentPart::text(format!("<task>\n{}\n</task>", task)));
    parts.extend(responses::image_blocks(images));
    vec![ChatMessage::with_parts(Role::User, parts)]
}

/// Split an image payload into `(media_type, base64_data)`.
///
/// Accepts either bare base64 or a `data:<media>;base64,<data>` URL. Bare
/// payloads are sniffed by magic bytes and default to PNG.
pub fn image_payload(image: &str) -> (String, &str) {
    if let Some(rest) = image.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            if let Some(media_type) = header.strip_suffix(";base64") {
                if !media_type.is_empty() {
                    return (media_type.to_string(), data);
                }
            }
            return (sniff_media_type(data).to_string(), data);
        }
    }
    (sniff_media_type(image).to_string(), image)
}

/// Detect an image type from the first decoded bytes of a base64 payload.
fn sniff_media_type(data: &str) -> &'static str {
    // 16 base64 characters decode to exactly 12 bytes, enough for every signature below.
    let prefix: String = data.chars().filter(|c| !c.is_whitespace()).take(16).collect();
    let Ok(bytes) = STANDARD.decode(prefix.as_bytes()) else {
        return DEFAULT_MEDIA_TYPE;
    };

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MEDIA_TYPE
    }
}
