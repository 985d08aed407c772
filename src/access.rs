use crate::entity::ScheduledEntity;
use std::collections::{HashMap, HashSet};

pub type ActorId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub login: String,
    pub admin: bool,
}

impl Actor {
    pub fn new(id: ActorId, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            admin: false,
        }
    }

    pub fn admin(id: ActorId, login: impl Into<String>) -> Self {
        Self {
            admin: true,
            ..Self::new(id, login)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    User,
    /// Recomputation sees every entity regardless of visibility.
    System,
}

/// The identity a call runs as, and whether it may bypass visibility.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    actor: Actor,
    elevation: Elevation,
}

impl ExecutionContext {
    pub fn system(on_behalf_of: Actor) -> Self {
        Self {
            actor: on_behalf_of,
            elevation: Elevation::System,
        }
    }

    pub fn user(actor: Actor) -> Self {
        Self {
            actor,
            elevation: Elevation::User,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn elevation(&self) -> Elevation {
        self.elevation
    }

    pub fn is_system(&self) -> bool {
        self.elevation == Elevation::System
    }
}

pub trait AccessPolicy {
    fn can_view(&self, viewer: &Actor, entity: &ScheduledEntity) -> bool;
}

/// Everyone sees everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn can_view(&self, _viewer: &Actor, _entity: &ScheduledEntity) -> bool {
        true
    }
}

/// Admins see everything; other actors see entities of projects they belong to.
#[derive(Debug, Clone, Default)]
pub struct ProjectMembership {
    members: HashMap<ActorId, HashSet<String>>,
}

impl ProjectMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, actor: ActorId, project: impl Into<String>) {
        self.members.entry(actor).or_default().insert(project.into());
    }

    pub fn with_member(mut self, actor: ActorId, project: impl Into<String>) -> Self {
        self.add_member(actor, project);
        self
    }
}

impl AccessPolicy for ProjectMembership {
    fn can_view(&self, viewer: &Actor, entity: &ScheduledEntity) -> bool {
        if viewer.admin {
            return true;
        }
        match (&entity.project, self.members.get(&viewer.id)) {
            (Some(project), Some(projects)) => projects.contains(project),
            _ => false,
        }
    }
}
