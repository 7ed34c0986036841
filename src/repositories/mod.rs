pub(crate) mod assessments;
pub(crate) mod sessions;
pub(crate) mod submissions;
pub(crate) mod users;
