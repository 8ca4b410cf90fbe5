mod issue_detail;
mod issues_list;

pub use issue_detail::IssueDetailView;
pub use issues_list::{IssuesDisplay, IssuesListModel, IssuesListView};
