//! Supported locales and the few strings the widget renders itself

use crate::widget::{Message, QuickOption};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

#[derive(Debug, Error)]
#[error("Unsupported locale: {0} (expected en or es)")]
pub struct UnknownLocale(String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    pub fn rate_limited(self) -> &'static str {
        match self {
            Locale::En => "You're sending messages a bit fast. Please wait a moment and try again.",
            Locale::Es => {
                "Estás enviando mensajes muy rápido. Espera un momento e inténtalo de nuevo."
            }
        }
    }

    pub fn generic_error(self) -> &'static str {
        match self {
            Locale::En => "Sorry, something went wrong. Please try again.",
            Locale::Es => "Lo siento, algo salió mal. Por favor, inténtalo de nuevo.",
        }
    }

    /// Opening bot message with the entry-point quick options
    pub fn greeting(self) -> Message {
        let (text, options) = match self {
            Locale::En => (
                "Hi! I'm the site assistant. How can I help you today?",
                [
                    ("See services", "services"),
                    ("Book a call", "book_call"),
                    ("Leave my contact", "leave_contact"),
                ],
            ),
            Locale::Es => (
                "¡Hola! Soy el asistente del sitio. ¿En qué puedo ayudarte hoy?",
                [
                    ("Ver servicios", "services"),
                    ("Agendar una llamada", "book_call"),
                    ("Dejar mi contacto", "leave_contact"),
                ],
            ),
        };
        Message::bot(text).with_quick_options(
            options
                .into_iter()
                .map(|(label, action)| QuickOption::new(label, action))
                .collect(),
        )
    }
}
