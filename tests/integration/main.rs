mod compiler_service_tests;
mod style_import_tests;
