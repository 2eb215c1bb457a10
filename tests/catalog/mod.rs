// Catalog integration tests
// Tests for fetching database objects from PostgreSQL and converting to catalog structs

pub mod grants;
