pub mod db_utils;
pub mod employee_code;
pub mod presence;
