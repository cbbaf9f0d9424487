mod chat_tests;
mod health_tests;
