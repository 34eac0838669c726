//! Writing locations to history.

use futures_util::future::BoxFuture;
use tracing::{debug, info};
use url::Url;

use crate::loading::LoadOutcome;
use crate::location::Location;
use crate::navigation::options::NavigateOptions;
use crate::navigation::{NavigationError, Router};
use crate::path::trim_path_right;

fn is_absolute(href: &str) -> bool {
    Url::parse(href).is_ok()
}

impl Router {
    /// Push (or replace) `next` onto history and load it. A location equal to
    /// the current entry only reloads.
    pub async fn commit_location(&self, next: Location, replace: bool) -> Result<LoadOutcome, NavigationError> {
        let current = self.parse_location();
        let unchanged = trim_path_right(&current.href) == trim_path_right(&next.href)
            && current.state.same_content(&next.state)
            && current.masked_location.is_none() == next.masked_location.is_none();

        if !unchanged {
            let (href, state) = match &next.masked_location {
                Some(masked) => {
                    let mut state = masked.state.clone();
                    state.temp_location = Some(next.href.clone());
                    state.temp_key = next.unmask_on_reload.then(|| self.inner.temp_key.clone());
                    (masked.public_href.clone(), state)
                }
                None => (next.public_href.clone(), next.state.clone()),
            };
            debug!(href = %href, replace, masked = next.masked_location.is_some(), "committing location");
            if replace {
                self.inner.history.replace(&href, state);
            } else {
                self.inner.history.push(&href, state);
            }
        }
        Ok(self.load().await)
    }

    /// Build and commit a destination. Absolute hrefs and `reload_document`
    /// leave the app and come back as [`LoadOutcome::ExternalRedirect`].
    pub fn navigate(&self, dest: NavigateOptions) -> BoxFuture<'_, Result<LoadOutcome, NavigationError>> {
        Box::pin(async move {
            let mut dest = dest;
            if let Some(href) = dest.href.as_deref() {
                if is_absolute(href) || dest.reload_document {
                    info!(href = %href, "leaving the app");
                    return Ok(LoadOutcome::ExternalRedirect(href.to_string()));
                }
            }
            if dest.reload_document {
                let location = self.build_location(&dest)?;
                let href = self.inner.history.create_href(&location.public_href);
                info!(href = %href, "document reload requested");
                return Ok(LoadOutcome::ExternalRedirect(href));
            }

            dest.include_validate_search = true;
            let replace = dest.replace;
            let location = self.build_location(&dest)?;
            self.commit_location(location, replace).await
        })
    }
}
