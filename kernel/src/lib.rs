// src/lib.rs
// Point d'entrée de la bibliothèque du noyau émulé
#![cfg_attr(not(test), no_std)]

// Import de alloc pour les allocations dynamiques
extern crate alloc;

// Modules du noyau
pub mod libutils; // Bibliothèque de modules réutilisables
pub mod scheduler;

// Réexportations publiques
pub use libutils::collections::{Cursor, LinkedList, ListError, NodePool, NodeRef};
pub use scheduler::{
    KPriorityQueue, KThread, KThreadIter, SchedulerError, SchedulerResult, ThreadId,
    CPU_CORES_COUNT, INVALID_CORE, PRIORITIES_COUNT,
};
