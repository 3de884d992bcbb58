pub mod crawl;
pub mod report;

pub fn print_banner() {
    eprintln!(
        r#"
   __ _ _ __ __ _  ___| |__  _ __   ___
  / _` | '__/ _` |/ __| '_ \| '_ \ / _ \
 | (_| | | | (_| | (__| | | | | | |  __/
  \__,_|_|  \__,_|\___|_| |_|_| |_|\___|  v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
