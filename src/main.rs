mod entry;
mod logger;

use media_e2e::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
