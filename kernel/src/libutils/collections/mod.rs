//! Structures de données du noyau
//!
//! Ce module fournit les structures de données de base utilisées par le
//! scheduler : cellules de liste recyclées via un pool et liste circulaire
//! doublement chaînée construite dessus.

pub mod linked_list;
pub mod node_pool;

// Réexportations
pub use linked_list::{Cursor, Iter, LinkedList, ListError};
pub use node_pool::{ListId, NodePool, NodeRef, RECYCLE_CAPACITY};
