/*!

This is the long-form manual for `paper_tally` and `papertally`.

## Counting rules

Every candidate belongs to one constituency and one age band. The pair is
called a cell. Each constituency has a cap, and the cap applies to each of its
cells separately: with a cap of 2, a ballot may mark two candidates of the
`18-35` band *and* two candidates of the `61+` band of that constituency.

A ballot is:
- **null** if any cell has more marks than its cap. The whole ballot is
  discarded, including the marks in the other constituencies;
- **blank** if nothing is marked (marks on deleted candidates do not count);
- **valid** otherwise. Each marked candidate receives one vote.

A clerk can also record a blank ballot directly; whatever is marked at that
moment is then ignored.

Only the last ballot can be undone. Undoing it removes it from the list and, if
it was valid, takes its votes back.

## Configuration

`papertally` uses the following layout unless a configuration file is given
with `--config`:

| constituency          | cap |
|-----------------------|-----|
| Santo Stefano         | 3   |
| San Pio X             | 2   |
| Immacolata ai Passi   | 1   |

with the age bands `18-35`, `36-60` and `61+`.

A configuration file looks like this:

```text
{
  "electionName": "Consiglio di Unità Pastorale",
  "constituencies": [
    { "name": "Santo Stefano", "maxVotes": 3 },
    { "name": "San Pio X", "maxVotes": 2 },
    { "name": "Immacolata ai Passi", "maxVotes": 1 }
  ],
  "ageBands": ["18-35", "36-60", "61+"]
}
```

The order of the constituencies and of the age bands is the order used for
listing candidates and for the results. Names must be unique, and a cap of 0
means no candidate of that constituency can be marked on a valid ballot.

## State file

The candidates and ballots are kept in a JSON file (`--state`, by default
`papertally_state.json`). It is rewritten after every change.

```text
{
  "candidates": [
    { "id": 1, "name": "Anna", "constituency": "San Pio X", "ageBand": "18-35" }
  ],
  "ballots": [
    { "id": 1, "timestamp": "2024-05-12T09:14:03Z", "category": "valid", "selectedCandidateIds": [1] },
    { "id": 2, "timestamp": "2024-05-12T09:14:40Z", "category": "blank", "selectedCandidateIds": [] }
  ],
  "totals": { "1": 1 },
  "lastCandidateId": 1
}
```

`lastCandidateId` is the highest candidate id ever used. New candidates get the
next id, so a removed candidate's id (and the votes it still holds) is never
given to someone else. An explicit `--id` that belongs to a removed candidate
with votes is refused.

The totals are not trusted: they are recomputed from the valid ballots when the
file is loaded, and a file whose totals disagree with its ballots is refused.
Constituency and age band names must exist in the current layout.

## Export

`papertally report --out results.csv` writes the results as CSV:

```text
Name,Constituency,AgeBand,Votes
Anna,San Pio X,18-35,1

ValidBallots,1
NullBallots,0
BlankBallots,1
TotalBallots,2
```

Candidates are grouped by cell in layout order, the most voted first within a
cell. Fields containing a comma are quoted. `--out stdout` prints the CSV
instead, and `--reference <file>` compares the results with a previous export
and shows the differences.

 */
