mod definition;
mod formatting;
