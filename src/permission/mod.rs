use crate::orm::{comments, posts, users};

/// A resource that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> i32;
}

/// Outcome of an ownership check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// Anonymous actor; authenticating may change the answer.
    LoginRequired,
    Forbidden,
}

/// Only the owner may mutate a resource.
pub fn check<R: Owned + ?Sized>(actor: Option<i32>, resource: &R) -> Access {
    match actor {
        None => Access::LoginRequired,
        Some(id) if id == resource.owner_id() => Access::Allowed,
        Some(_) => Access::Forbidden,
    }
}

impl Owned for posts::Model {
    fn owner_id(&self) -> i32 {
        self.author_id
    }
}

impl Owned for comments::Model {
    fn owner_id(&self) -> i32 {
        self.author_id
    }
}

impl Owned for users::Model {
    fn owner_id(&self) -> i32 {
        self.id
    }
}

impl Owned for crate::post::PostForTemplate {
    fn owner_id(&self) -> i32 {
        self.author_id
    }
}
