// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - enums : rôles, types de contenu, statuts (stockés en texte)
//   - users : comptes (rôle, préférences 2FA)
//   - articles / videos / formations : contenus publiables, premium ou non
//   - video_formations : vidéos ordonnées d'une formation
//   - parcours / parcours_formations : formations ordonnées d'un parcours
//   - categories : catégories de contenu
//   - purchases : achats unitaires (contenu polymorphe)
//   - subscriptions : abonnement premium (1 par user)
//   - comments / ratings / history : interactions sur un contenu
//   - notifications : notifications in-app
//   - messages : formulaire de contact
//   - formator_queries : demandes pour devenir formateur
//   - two_factor_auth : codes 2FA en attente
//   - admin_settings : réglages globaux (ligne unique)
//   - todos : tâches du back-office
//   - dto / health : structures de réponse API
//
// Points d'attention:
//   - Tous les accès passent par SeaORM (pas de SQL brut)
//   - (content_type, content_id) n'a pas de clé étrangère : la cohérence est
//     assurée par services::cascade
//
// ============================================================================

pub mod enums;
pub mod health;
pub mod dto;
pub mod users;
pub mod articles;
pub mod videos;
pub mod formations;
pub mod video_formations;
pub mod parcours;
pub mod parcours_formations;
pub mod categories;
pub mod purchases;
pub mod subscriptions;
pub mod comments;
pub mod ratings;
pub mod history;
pub mod notifications;
pub mod messages;
pub mod formator_queries;
pub mod two_factor_auth;
pub mod admin_settings;
pub mod todos;
