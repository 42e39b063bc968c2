pub mod matricula_index;
pub mod sql_update;
