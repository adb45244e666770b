pub(crate) mod table_definitions;
