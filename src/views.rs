//! HTML fragments for the htmx front end. Templates are embedded at compile
//! time; every value substituted into them goes through `escape` or
//! `markdown` first, so a user can never inject a placeholder or markup.

use time::{OffsetDateTime, macros::format_description};

use crate::{
    include_res,
    models::{ChatMessage, Conversation, ConversationId, Message, User},
};

pub const NO_MESSAGES_MARKER: &str = "No messages yet";

/// Latest-message excerpt of a chat-list row, from the owner's viewpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Empty,
    Mine(String),
    Theirs { sender: String, content: String },
}

impl Preview {
    pub fn of(viewer: &str, message: &Message) -> Self {
        if message.sender.handle == viewer {
            Preview::Mine(message.content.clone())
        } else {
            Preview::Theirs {
                sender: message.sender.display_name.clone(),
                content: message.content.clone(),
            }
        }
    }

    pub fn text(&self) -> String {
        match self {
            Preview::Empty => NO_MESSAGES_MARKER.to_owned(),
            Preview::Mine(content) => format!("You: {content}"),
            Preview::Theirs { sender, content } => format!("{sender}: {content}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub conversation: ConversationId,
    pub title: String,
    pub preview: Preview,
    pub time: Option<OffsetDateTime>,
}

impl ChatSummary {
    pub fn new(viewer: &str, conversation: ConversationId, title: impl Into<String>, latest: Option<&Message>) -> Self {
        Self {
            conversation,
            title: title.into(),
            preview: latest.map_or(Preview::Empty, |message| Preview::of(viewer, message)),
            time: latest.map(|message| message.created),
        }
    }

    pub fn from_conversation(viewer: &str, conversation: Conversation) -> Self {
        Self::new(viewer, conversation.id, conversation.title, conversation.latest.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub outgoing: bool,
    pub sender_name: String,
    pub content: String,
    pub time: OffsetDateTime,
}

impl Bubble {
    pub fn of(viewer: &str, message: &Message) -> Self {
        Self {
            outgoing: message.sender.handle == viewer,
            sender_name: message.sender.display_name.clone(),
            content: message.content.clone(),
            time: message.created,
        }
    }
}

/// An open conversation: its title and full history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadView {
    pub conversation: ConversationId,
    pub title: String,
    pub bubbles: Vec<Bubble>,
}

impl ThreadView {
    pub fn new(viewer: &str, conversation: ConversationId, title: impl Into<String>, history: &[ChatMessage]) -> Self {
        Self {
            conversation,
            title: title.into(),
            bubbles: history.iter().map(|m| Bubble::of(viewer, &m.message)).collect(),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            c => out.push(c),
        }
    }
    out
}

/// Message bodies are Markdown; raw HTML in them is shown as text and links
/// or images pointing anywhere but http(s) or mailto lose their target.
pub fn markdown(content: &str) -> String {
    use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};

    let parser = Parser::new_ext(content, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: CowStr::Borrowed(""), title, id })
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Image { link_type, dest_url: CowStr::Borrowed(""), title, id })
        }
        _ => event,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html.replace('{', "&#123;").replace('}', "&#125;")
}

/// Relative URLs pass; absolute ones need an allowed scheme. Browsers ignore
/// whitespace and control characters inside a scheme, so those are dropped
/// before comparing.
fn safe_url(url: &str) -> bool {
    let cleaned = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match cleaned.find([':', '/', '?', '#']) {
        Some(at) if cleaned[at..].starts_with(':') => {
            matches!(&cleaned[..at], "http" | "https" | "mailto")
        }
        _ => true,
    }
}

pub fn clock(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

pub fn page(main_content: &str) -> String {
    include_res!(str, "/pages/root.html").replace("{main_content}", main_content)
}

pub fn register_form() -> &'static str {
    include_res!(str, "/pages/register.html")
}

pub fn login_form() -> &'static str {
    include_res!(str, "/pages/login.html")
}

pub fn validation(ok: bool, text: &str) -> String {
    include_res!(str, "/pages/validation.html")
        .replace("{class}", if ok { "green-text" } else { "red-text" })
        .replace("{icon}", if ok { "check" } else { "close" })
        .replace("{text}", &escape(text))
}

/// The logged-in shell: chat list, empty thread pane and the live channel.
pub fn main_view(user: &User, chats: &[ChatSummary]) -> String {
    let items: String = chats.iter().map(|chat| chat_item(chat, "")).collect();

    let main = include_res!(str, "/pages/main.html")
        .replace("{user_name}", &escape(&user.display_name))
        .replace("{active_chat}", include_res!(str, "/pages/chats/no_chat.html"))
        .replace("{chats}", &items);

    main + include_res!(str, "/pages/websocket.html")
}

/// Hex keeps the id usable as a bare `#id` selector whatever the handle or
/// group name contains.
fn dom_id(conversation: &ConversationId) -> String {
    format!("chat-{}", hex::encode(conversation.key()))
}

fn chat_item(summary: &ChatSummary, oob: &str) -> String {
    let (get_url, vals) = match &summary.conversation {
        ConversationId::Private(handle) => ("/private-chat", serde_json::json!({ "target": handle })),
        ConversationId::Group(name) => ("/group-chat", serde_json::json!({ "target": name })),
    };
    let preview = match &summary.preview {
        Preview::Empty => format!("<em>{NO_MESSAGES_MARKER}</em>"),
        preview => escape(&preview.text()),
    };

    include_res!(str, "/pages/chats/chat_item.html")
        .trim_end()
        .replace("{dom_id}", &escape(&dom_id(&summary.conversation)))
        .replace("{oob}", oob)
        .replace("{get_url}", get_url)
        .replace("{vals}", &escape(&vals.to_string()))
        .replace("{title}", &escape(&summary.title))
        .replace("{preview}", &preview)
        .replace("{time}", &summary.time.map(clock).unwrap_or_default())
}

/// Drops the row if the client has it and re-inserts it at the top of the
/// list, which is where the most recently active conversation belongs.
pub fn chat_item_to_top(summary: &ChatSummary) -> String {
    format!(
        r#"<div id="{}" hx-swap-oob="delete"></div><div hx-swap-oob="afterbegin:#chats">{}</div>"#,
        escape(&dom_id(&summary.conversation)),
        chat_item(summary, ""),
    )
}

pub fn chat_item_removed(conversation: &ConversationId) -> String {
    format!(r#"<div id="{}" hx-swap-oob="delete"></div>"#, escape(&dom_id(conversation)))
}

pub fn bubble(bubble: &Bubble) -> String {
    let time = clock(bubble.time);
    if bubble.outgoing {
        include_res!(str, "/pages/chats/message_sent.html")
            .trim_end()
            .replace("{time}", &time)
            .replace("{content}", &markdown(&bubble.content))
    } else {
        include_res!(str, "/pages/chats/message_received.html")
            .trim_end()
            .replace("{sender}", &escape(&bubble.sender_name))
            .replace("{time}", &time)
            .replace("{content}", &markdown(&bubble.content))
    }
}

/// Appends to whichever open thread carries the conversation's key; a
/// client showing another thread has no such element and ignores it.
pub fn bubble_appended(conversation: &ConversationId, b: &Bubble) -> String {
    format!(
        r#"<div hx-swap-oob="beforeend:[chat-target='{}']">{}</div>"#,
        escape(&conversation.key()),
        bubble(b),
    )
}

pub fn thread(view: &ThreadView, oob: bool) -> String {
    let send_url = match view.conversation {
        ConversationId::Private(_) => "/private-message",
        ConversationId::Group(_) => "/group-message",
    };
    let messages: String = view.bubbles.iter().map(bubble).collect();

    include_res!(str, "/pages/chats/active_chat.html")
        .replace("{oob}", if oob { r#" hx-swap-oob="outerHTML""# } else { "" })
        .replace("{key}", &escape(&view.conversation.key()))
        .replace("{title}", &escape(&view.title))
        .replace("{send_url}", send_url)
        .replace("{target}", &escape(view.conversation.name()))
        .replace("{messages}", &messages)
}
