mod entry;
mod logger;

use mqtt_load_generator::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
