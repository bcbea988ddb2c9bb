// Job-seeker coaching endpoints: resume optimisation, interview prep,
// mock interviews, free-form chat and company intelligence.
// All model calls go through the relay; nothing here talks to a vendor directly.

pub mod handlers;
pub mod prompts;
