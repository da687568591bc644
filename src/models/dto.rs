//pour les réponses structurées et les paramètres partagés
use serde::{Deserialize, Serialize};

use super::enums::ContentType;

/// Filtres des listes de contenus (?category=3&premium=true)
#[derive(Debug, Deserialize)]
pub struct ContentFilter {
    pub category: Option<i32>,
    pub premium: Option<bool>,
}

/// Désigne un contenu : (?content_type=VIDEO&content_id=12)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContentKey {
    pub content_type: ContentType,
    pub content_id: i32,
}

#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub content_type: ContentType,
    pub content_id: i32,
    pub average: Option<f64>,
    pub count: usize,
}

/// Contenu renvoyé au visiteur : `body` est masqué si `has_access` est faux.
#[derive(Debug, Serialize)]
pub struct Gated<T: Serialize, B: Serialize> {
    #[serde(flatten)]
    pub item: T,
    pub has_access: bool,
    pub body: Option<B>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub premium_users: u64,
    pub formators: u64,
    pub articles: u64,
    pub videos: u64,
    pub formations: u64,
    pub purchases: u64,
    pub active_subscriptions: u64,
    pub pending_formator_queries: u64,
}
