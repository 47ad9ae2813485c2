// src/macros.rs

/// `String` shorthand.
#[macro_export]
macro_rules! s {
    () => {
        ::std::string::String::new()
    };
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

/// Concatenate string-likes into one owned `String`.
#[macro_export]
macro_rules! join {
    ($first:expr $(, $rest:expr)+ $(,)?) => {{
        let mut s = ::std::string::String::from($first);
        $(
            s.push_str($rest);
        )+
        s
    }};
}

/// Build one table row (`Vec<String>`) from string-likes.
#[macro_export]
macro_rules! row {
    () => {
        ::std::vec::Vec::<::std::string::String>::new()
    };
    ($($cell:expr),+ $(,)?) => {
        ::std::vec![$(::std::string::String::from($cell)),+]
    };
}
